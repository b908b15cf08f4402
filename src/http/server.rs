//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum Router from the configured API modules
//! - Wire up middleware (CORS, tracing, request ID, concurrency limit)
//! - Serve until the shutdown signal fires

use std::io;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::{self, ApiModule, UnknownApiModule};
use crate::config::Settings;
use crate::graph::GraphClient;
use crate::http::request::MakeRequestUuidV4;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub graph: GraphClient,
    pub settings: Arc<Settings>,
}

#[derive(Serialize)]
struct ServiceHealth {
    status: &'static str,
    service: String,
    version: &'static str,
}

/// HTTP front end for the service.
pub struct HttpServer {
    router: Router,
    settings: Arc<Settings>,
}

impl HttpServer {
    /// Build the server, mounting every module named in `api_modules`.
    pub fn new(settings: Arc<Settings>, graph: GraphClient) -> Result<Self, UnknownApiModule> {
        let modules = api::select(&settings.api_modules)?;
        let state = AppState {
            graph,
            settings: settings.clone(),
        };
        let router = Self::build_router(&settings, &modules, state);
        Ok(Self { router, settings })
    }

    fn build_router(settings: &Settings, modules: &[&ApiModule], state: AppState) -> Router {
        let mut router = Router::new().route("/health", get(service_health));
        for module in modules {
            router = (module.register)(router);
            tracing::debug!(module = module.name, "API module registered");
        }

        router
            .with_state(state)
            .layer(cors_layer(&settings.cors_origins))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(GlobalConcurrencyLimitLayer::new(settings.max_in_flight()))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            app = %self.settings.app_name,
            max_in_flight = self.settings.max_in_flight(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// CORS policy.
///
/// Configured origins may send credentials. Without any, every origin is
/// mirrored back but credentials are never allowed.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin.trim_end_matches('/')).ok())
        .collect();
    if allowed.is_empty() {
        layer.allow_origin(AllowOrigin::mirror_request())
    } else {
        layer
            .allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
    }
}

async fn service_health(State(state): State<AppState>) -> Json<ServiceHealth> {
    Json(ServiceHealth {
        status: "ok",
        service: state.settings.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
