//! Route-handler modules.
//!
//! # Data Flow
//! ```text
//! Settings.api_modules ["neo4j_api", ...]
//!     → select() (lookup in the static API_MODULES table)
//!     → ApiModule::register (adds routes to the axum Router)
//! ```
//!
//! # Design Decisions
//! - The set of modules is fixed at build time; configuration only picks
//!   which of them are mounted
//! - An unknown configured name fails startup instead of being skipped

use axum::Router;
use thiserror::Error;

use crate::http::server::AppState;

pub mod cypher;
pub mod neo4j;

/// A named group of routes.
pub struct ApiModule {
    pub name: &'static str,
    pub register: fn(Router<AppState>) -> Router<AppState>,
}

/// Every module this build can mount.
pub const API_MODULES: &[ApiModule] = &[ApiModule {
    name: "neo4j_api",
    register: neo4j::routes,
}];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown API module '{name}'")]
pub struct UnknownApiModule {
    pub name: String,
}

/// Resolve configured module names against [`API_MODULES`], keeping the
/// configured order and dropping repeats.
pub fn select(names: &[String]) -> Result<Vec<&'static ApiModule>, UnknownApiModule> {
    let mut selected: Vec<&'static ApiModule> = Vec::with_capacity(names.len());
    for name in names {
        let module = API_MODULES
            .iter()
            .find(|m| m.name == name.trim())
            .ok_or_else(|| UnknownApiModule { name: name.clone() })?;
        if !selected.iter().any(|m| m.name == module.name) {
            selected.push(module);
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_known_modules() {
        let names = vec!["neo4j_api".to_string(), " neo4j_api".to_string()];
        let selected = select(&names).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "neo4j_api");
    }

    #[test]
    fn test_select_unknown_module() {
        let names = vec!["neo4j_api".to_string(), "billing_api".to_string()];
        let err = select(&names).err().unwrap();
        assert_eq!(err.name, "billing_api");
    }

    #[test]
    fn test_select_nothing() {
        assert!(select(&[]).unwrap().is_empty());
    }
}
