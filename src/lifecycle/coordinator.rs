//! Process lifecycle: start both listeners, wait for a stop signal, drain.
//!
//! ```text
//! Starting ──bind+spawn──▶ Running ──signal──▶ ShuttingDown ──join/deadline──▶ Stopped
//!                             │
//!                             └── a server exits early ──▶ fatal
//! ```
//!
//! Every error here is fatal to the process; restarting is left to whatever
//! supervises it.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::future::select_all;
use tokio::task::JoinError;
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::{bind, ServerHandle};
use crate::observability::logging::Logger;

pub const PRIMARY: &str = "primary";
pub const METRICS: &str = "metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Failure of one server while draining.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("{name} server did not drain before the shutdown deadline")]
    DeadlineExceeded { name: &'static str },

    #[error("{name} server failed while draining: {source}")]
    Serve {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{name} server task failed: {source}")]
    Join {
        name: &'static str,
        #[source]
        source: JoinError,
    },
}

impl ShutdownError {
    pub fn server(&self) -> &'static str {
        match self {
            ShutdownError::DeadlineExceeded { name }
            | ShutdownError::Serve { name, .. }
            | ShutdownError::Join { name, .. } => *name,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to bind {name} listener on {address}: {source}")]
    Bind {
        name: &'static str,
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("{name} server stopped unexpectedly: {source}")]
    Serve {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{name} server task failed: {source}")]
    Join {
        name: &'static str,
        #[source]
        source: JoinError,
    },

    #[error("failed to listen for shutdown signal: {0}")]
    Signal(#[source] io::Error),

    #[error("shutdown failed: {}", describe(.0))]
    Shutdown(Vec<ShutdownError>),
}

fn describe(errors: &[ShutdownError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Owns the primary and metrics servers from bind to drain.
pub struct Lifecycle {
    logger: Logger,
    shutdown_timeout: Duration,
    shutdown: Shutdown,
    servers: Vec<ServerHandle>,
    phase: Phase,
}

impl Lifecycle {
    /// Bind both listeners and start serving.
    pub async fn start(
        config: &AppConfig,
        logger: Logger,
        primary: Router,
        metrics: Router,
    ) -> Result<Self, LifecycleError> {
        let mut lifecycle = Self {
            logger,
            shutdown_timeout: config.shutdown.timeout(),
            shutdown: Shutdown::new(),
            servers: Vec::with_capacity(2),
            phase: Phase::Starting,
        };
        lifecycle.log_phase();

        let primary_listener = bind(PRIMARY, &config.listener.bind_address, &lifecycle.logger).await?;
        let metrics_listener = bind(METRICS, &config.metrics.bind_address, &lifecycle.logger).await?;

        for (name, listener, router) in [
            (PRIMARY, primary_listener, primary),
            (METRICS, metrics_listener, metrics),
        ] {
            let handle = ServerHandle::spawn(
                name,
                listener,
                router,
                lifecycle.shutdown.signalled(),
                &lifecycle.logger,
            )
            .map_err(|source| LifecycleError::Serve { name, source })?;
            lifecycle.servers.push(handle);
        }

        lifecycle.set_phase(Phase::Running);
        Ok(lifecycle)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Local address of the named server, once bound.
    pub fn local_addr(&self, name: &str) -> Option<SocketAddr> {
        self.servers
            .iter()
            .find(|s| s.name() == name)
            .map(ServerHandle::local_addr)
    }

    pub fn primary_addr(&self) -> Option<SocketAddr> {
        self.local_addr(PRIMARY)
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.local_addr(METRICS)
    }

    /// Serve until `signal` resolves, then shut everything down.
    ///
    /// A server ending before the signal is fatal: the others are aborted and
    /// the cause returned.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::select! {
            res = signal => {
                if let Err(e) = res {
                    self.terminate_all().await;
                    return Err(LifecycleError::Signal(e));
                }
                self.logger.in_scope(|| tracing::info!("Shutdown signal received"));
            }
            (index, exit) = first_exit(&mut self.servers) => {
                let name = self.servers[index].name();
                self.terminate_all().await;
                let err = match exit {
                    Ok(Ok(())) => LifecycleError::Serve {
                        name,
                        source: io::Error::other("server exited before shutdown was requested"),
                    },
                    Ok(Err(source)) => LifecycleError::Serve { name, source },
                    Err(source) => LifecycleError::Join { name, source },
                };
                self.logger.in_scope(|| tracing::error!(server = name, error = %err, "Server failed"));
                return Err(err);
            }
        }

        self.shutdown().await
    }

    /// Drain every server against one shared deadline, collecting all errors.
    pub async fn shutdown(mut self) -> Result<(), LifecycleError> {
        self.set_phase(Phase::ShuttingDown);
        self.shutdown.trigger();

        let deadline = Instant::now() + self.shutdown_timeout;
        let mut errors = Vec::new();
        for server in std::mem::take(&mut self.servers) {
            let name = server.name();
            match server.join_until(deadline).await {
                Ok(()) => self
                    .logger
                    .in_scope(|| tracing::info!(server = name, "Server stopped")),
                Err(e) => {
                    self.logger
                        .in_scope(|| tracing::error!(server = name, error = %e, "Server shutdown failed"));
                    errors.push(e);
                }
            }
        }

        self.set_phase(Phase::Stopped);
        if errors.is_empty() {
            self.logger.in_scope(|| tracing::info!("Shutdown complete"));
            Ok(())
        } else {
            Err(LifecycleError::Shutdown(errors))
        }
    }

    async fn terminate_all(&mut self) {
        for server in std::mem::take(&mut self.servers) {
            server.terminate().await;
        }
        self.set_phase(Phase::Stopped);
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.log_phase();
    }

    fn log_phase(&self) {
        let phase = self.phase;
        self.logger.in_scope(|| tracing::debug!(phase = ?phase, "Lifecycle phase"));
    }
}

/// Resolve with the first server task to end on its own.
async fn first_exit(servers: &mut [ServerHandle]) -> (usize, Result<io::Result<()>, JoinError>) {
    if servers.is_empty() {
        return std::future::pending().await;
    }
    let (exit, index, _) = select_all(servers.iter_mut().map(|s| Box::pin(s.exited()))).await;
    (index, exit)
}
