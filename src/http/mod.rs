//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, middleware stack)
//!     → request.rs (request ID assigned / propagated)
//!     → request_log.rs (one audit record per request, /health skipped)
//!     → handlers.rs (fixed JSON payloads)
//!     → error.rs (handler errors rendered as JSON)
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod request_log;
pub mod server;

pub use error::AppError;
pub use handlers::VersionInfo;
pub use request::X_REQUEST_ID;
pub use server::{metrics_router, primary_router, AppState};
