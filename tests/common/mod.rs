//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use app::config::AppConfig;
use app::http::{metrics_router, primary_router, AppState, VersionInfo};
use app::lifecycle::{Lifecycle, LifecycleError};
use app::observability::{LogFormat, Logger, RequestMetrics};
use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// In-memory log sink.
#[derive(Clone, Default)]
pub struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
    /// Every JSON record written so far.
    pub fn records(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    /// Only the per-request audit records.
    pub fn request_records(&self) -> Vec<serde_json::Value> {
        self.records()
            .into_iter()
            .filter(|r| r["message"] == "request" || r["message"] == "request_error")
            .collect()
    }
}

impl io::Write for Logs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Logs {
    type Writer = Logs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Config bound to ephemeral loopback ports.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.metrics.bind_address = "127.0.0.1:0".into();
    config.shutdown.timeout_secs = 1;
    config.assets.index_path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/pages/index.html").into();
    config
}

pub fn json_logger() -> (Logger, Logs) {
    let logs = Logs::default();
    let logger = Logger::with_writer(LogFormat::Json, EnvFilter::new("debug"), logs.clone());
    (logger, logs)
}

/// A running service plus the means to stop it.
pub struct TestApp {
    pub primary: SocketAddr,
    pub metrics: SocketAddr,
    pub logs: Logs,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), LifecycleError>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.primary, path)
    }

    pub fn metrics_url(&self) -> String {
        format!("http://{}/metrics", self.metrics)
    }

    /// Deliver the stop signal and wait for the lifecycle to finish.
    pub async fn stop(self) -> Result<(), LifecycleError> {
        let _ = self.stop.send(());
        self.task.await.unwrap()
    }
}

/// Start the full service with `version` reported at `/`.
pub async fn spawn_app(version: &str) -> TestApp {
    let config = test_config();
    let (logger, logs) = json_logger();
    let metrics = RequestMetrics::new(&config.metrics.subsystem).unwrap();
    let state = AppState::new(&config, logger.clone(), metrics.clone())
        .with_version(VersionInfo::new(app::APPLICATION, version));

    spawn_routers(config, logger, logs, primary_router(&state), metrics_router(metrics)).await
}

/// Start a lifecycle around arbitrary routers.
pub async fn spawn_routers(
    config: AppConfig,
    logger: Logger,
    logs: Logs,
    primary: Router,
    metrics: Router,
) -> TestApp {
    let lifecycle = Lifecycle::start(&config, logger, primary, metrics)
        .await
        .unwrap();
    let primary = lifecycle.primary_addr().unwrap();
    let metrics = lifecycle.metrics_addr().unwrap();

    let (stop, stopped) = oneshot::channel();
    let task = tokio::spawn(lifecycle.run_until(signal_from(stopped)));

    TestApp {
        primary,
        metrics,
        logs,
        stop,
        task,
    }
}

fn signal_from(rx: oneshot::Receiver<()>) -> impl Future<Output = io::Result<()>> {
    async move {
        let _ = rx.await;
        Ok(())
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
