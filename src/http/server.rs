//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the primary router (version, health, hello, index page)
//! - Wire up middleware (request ID, request logging, panic recovery, metrics)
//! - Build the metrics router serving the Prometheus exposition
//!
//! # Middleware order (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → request log → CatchPanic → metrics → handler
//! ```

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeFile};

use crate::config::AppConfig;
use crate::http::error::AppError;
use crate::http::handlers::{self, VersionInfo, HEALTH_PATH};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::request_log::log_requests;
use crate::observability::logging::Logger;
use crate::observability::metrics::{track_requests, RequestMetrics};

pub const INDEX_PATH: &str = "/index.html";
pub const METRICS_PATH: &str = "/metrics";

/// Everything the primary router needs.
#[derive(Clone, Debug)]
pub struct AppState {
    pub version: Arc<VersionInfo>,
    pub logger: Logger,
    pub metrics: RequestMetrics,
    pub index_path: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig, logger: Logger, metrics: RequestMetrics) -> Self {
        Self {
            version: Arc::new(VersionInfo::current()),
            logger,
            metrics,
            index_path: PathBuf::from(&config.assets.index_path),
        }
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = Arc::new(version);
        self
    }
}

/// Build the primary router with all middleware layers.
pub fn primary_router(state: &AppState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::version))
        .route(HEALTH_PATH, get(handlers::health))
        .route("/hello", get(handlers::hello))
        .route_service(INDEX_PATH, ServeFile::new(&state.index_path))
        .fallback(handlers::not_found)
        .with_state(state.version.clone());

    with_middleware(routes, state)
}

/// Wrap `router` in the request ID, logging, recovery and metrics layers.
pub(crate) fn with_middleware(router: Router, state: &AppState) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(propagate_request_id_layer())
            .layer(middleware::from_fn_with_state(state.logger.clone(), log_requests))
            .layer(CatchPanicLayer::custom(recover_panic))
            .layer(middleware::from_fn_with_state(state.metrics.clone(), track_requests)),
    )
}

/// Build the router for the metrics listener.
pub fn metrics_router(metrics: RequestMetrics) -> Router {
    Router::new()
        .route(METRICS_PATH, get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<RequestMetrics>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render(),
    )
}

fn recover_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Internal(message).into_response()
}
