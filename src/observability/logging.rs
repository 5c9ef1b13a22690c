//! Structured logging.
//!
//! The logger is an explicit value: a `tracing` [`Dispatch`] built once at
//! startup and handed to whoever emits records (request logging, lifecycle).
//! Production writes one JSON object per line; anything else writes text.

use std::io;

use tracing::dispatcher::{self, Dispatch};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Output encoding of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// Line-delimited JSON with event fields flattened to the top level.
    Json,
}

impl LogFormat {
    /// Pick the encoding from the environment indicator.
    pub fn for_environment(environment: &str) -> Self {
        if environment == crate::config::schema::PRODUCTION {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// A process logging sink that can be cloned and passed around.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    format: LogFormat,
}

impl Logger {
    /// Build a logger writing to standard output.
    pub fn stdout(format: LogFormat, filter: EnvFilter) -> Self {
        Self::with_writer(format, filter, io::stdout)
    }

    /// Build a logger writing to an arbitrary writer.
    pub fn with_writer<W>(format: LogFormat, filter: EnvFilter, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let registry = tracing_subscriber::registry().with(filter);
        let dispatch = match format {
            LogFormat::Json => Dispatch::new(
                registry.with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_writer(writer),
                ),
            ),
            LogFormat::Text => Dispatch::new(
                registry.with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ),
            ),
        };

        Self { dispatch, format }
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Run `f` with this logger as the active sink.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Also route events from code that logs without a logger handle
    /// (dependencies, panics in spawned tasks) into this sink.
    pub fn install_global(&self) -> Result<(), dispatcher::SetGlobalDefaultError> {
        dispatcher::set_global_default(self.dispatch.clone())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("format", &self.format).finish()
    }
}
