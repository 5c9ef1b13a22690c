//! Version, health and metrics service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   :8080         │  request id → request log → recover → metrics │
//!  ─────────────▶ │        → /  /health  /hello  /index.html      │
//!                 └──────────────────────────────────────────────┘
//!                                        │ samples
//!                                        ▼
//!   :8081         ┌──────────────────────────────────────────────┐
//!  ─────────────▶ │                 /metrics                      │
//!                 └──────────────────────────────────────────────┘
//!
//!   lifecycle: bind both → serve both → signal → drain both (shared deadline)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

/// Application name reported by the version endpoint.
pub const APPLICATION: &str = "app";

/// Build version, injected through `APP_VERSION` at compile time.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(version) => version,
    None => "unknown",
};

pub use config::AppConfig;
pub use lifecycle::Lifecycle;
pub use observability::Logger;
