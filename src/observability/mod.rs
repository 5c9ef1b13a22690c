//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handling / lifecycle produce:
//!     → logging.rs (structured log records through an injected Logger)
//!     → metrics.rs (counters, histograms in a private Prometheus recorder)
//!
//! Consumers:
//!     → stdout (text in development, JSON lines in production)
//!     → metrics listener (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, Logger};
pub use metrics::RequestMetrics;
