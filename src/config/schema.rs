//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value of the environment indicator that switches logging to JSON.
pub const PRODUCTION: &str = "production";

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment ("production" selects JSON logs).
    pub environment: String,

    /// Primary listener configuration.
    pub listener: ListenerConfig,

    /// Metrics listener and instrumentation settings.
    pub metrics: MetricsConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Static assets.
    pub assets: AssetsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            listener: ListenerConfig::default(),
            metrics: MetricsConfig::default(),
            shutdown: ShutdownConfig::default(),
            logging: LoggingConfig::default(),
            assets: AssetsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Whether the service runs in production.
    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }
}

/// Primary listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Metrics endpoint bind address.
    pub bind_address: String,

    /// Prefix for every exported metric name.
    pub subsystem: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            subsystem: crate::APPLICATION.to_string(),
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Deadline shared by all listeners while draining, in seconds.
    pub timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or an `EnvFilter` expression).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
        }
    }
}

/// Static asset locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// File served at `/index.html`.
    pub index_path: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            index_path: "assets/pages/index.html".to_string(),
        }
    }
}
