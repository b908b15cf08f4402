//! Process-wide settings cache.
//!
//! Resolution runs at most once per successful initialization: concurrent
//! first callers serialize on an init guard, the winner resolves and
//! publishes, and everyone else reads the published value. A failed
//! resolution is not cached, so the next call retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::config::loader::{ConfigError, SourceLoader};
use crate::config::schema::Settings;

/// Compute-once holder for [`Settings`].
pub struct SettingsCache {
    cell: OnceLock<Arc<Settings>>,
    init: Mutex<()>,
    resolutions: AtomicUsize,
}

impl SettingsCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
            resolutions: AtomicUsize::new(0),
        }
    }

    /// Return the cached settings, running `resolve` if none are cached yet.
    pub fn get_or_resolve<F>(&self, resolve: F) -> Result<Arc<Settings>, ConfigError>
    where
        F: FnOnce() -> Result<Settings, ConfigError>,
    {
        if let Some(settings) = self.cell.get() {
            return Ok(settings.clone());
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have published while we waited.
        if let Some(settings) = self.cell.get() {
            return Ok(settings.clone());
        }

        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let settings = Arc::new(resolve()?);
        let _ = self.cell.set(settings.clone());
        Ok(settings)
    }

    /// Cached settings, if resolution has succeeded.
    pub fn get(&self) -> Option<Arc<Settings>> {
        self.cell.get().cloned()
    }

    /// How many times resolution has been attempted.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}

static SETTINGS: SettingsCache = SettingsCache::new();

/// Process-wide settings resolved from the process environment.
pub fn get_settings() -> Result<Arc<Settings>, ConfigError> {
    SETTINGS.get_or_resolve(|| SourceLoader::from_env()?.resolve())
}

/// Process-wide settings, resolving through `loader` on first use.
///
/// Once settings are cached, `loader` is ignored.
pub fn get_settings_with(loader: &SourceLoader) -> Result<Arc<Settings>, ConfigError> {
    SETTINGS.get_or_resolve(|| loader.resolve())
}
