//! Configuration validation.
//!
//! Serde handles the syntax; this checks what serde cannot: addresses resolve,
//! listeners do not collide, the deadline is non-zero, names are usable as
//! metric prefixes. Every problem is reported, not just the first.

use std::net::{SocketAddr, ToSocketAddrs};

use tracing_subscriber::EnvFilter;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("listener.bind_address and metrics.bind_address are both {0}")]
    AddressConflict(SocketAddr),

    #[error("shutdown.timeout_secs must be greater than zero")]
    ZeroShutdownTimeout,

    #[error("metrics.subsystem {0:?} is not a valid metric name prefix")]
    InvalidSubsystem(String),

    #[error("logging.level {0:?} is not a valid filter directive")]
    InvalidLogLevel(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let primary = resolve_addr("listener.bind_address", &config.listener.bind_address, &mut errors);
    let metrics = resolve_addr("metrics.bind_address", &config.metrics.bind_address, &mut errors);

    if let (Some(primary), Some(metrics)) = (primary, metrics) {
        // Port 0 asks the OS for a fresh port each time, so it never collides.
        if primary == metrics && primary.port() != 0 {
            errors.push(ValidationError::AddressConflict(primary));
        }
    }

    if config.shutdown.timeout_secs == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    if !is_metric_prefix(&config.metrics.subsystem) {
        errors.push(ValidationError::InvalidSubsystem(config.metrics.subsystem.clone()));
    }

    if EnvFilter::try_new(&config.logging.level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn resolve_addr(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    // Same resolution `TcpListener::bind` performs, so `localhost:8080` passes.
    match value.to_socket_addrs().ok().and_then(|mut addrs| addrs.next()) {
        Some(addr) => Some(addr),
        None => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

/// Prometheus names: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn is_metric_prefix(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
