//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (concurrency limit, request ID, trace, CORS)
//!     → api:: modules (route handlers)
//!     → GraphClient
//!     → JSON response (x-request-id echoed)
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{cors_layer, AppState, HttpServer};
