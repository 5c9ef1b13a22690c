//! Route handlers.
//!
//! None of these do fallible work: each returns a fixed JSON payload.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::error::AppError;

pub const HEALTH_PATH: &str = "/health";

/// Application name and build version, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub application: String,
    pub version: String,
}

impl VersionInfo {
    pub fn new(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
        }
    }

    /// The values baked into this binary.
    pub fn current() -> Self {
        Self::new(crate::APPLICATION, crate::VERSION)
    }
}

/// Liveness payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hello {
    pub hello: &'static str,
}

pub async fn version(State(info): State<Arc<VersionInfo>>) -> Json<VersionInfo> {
    Json(VersionInfo::clone(&info))
}

/// Liveness only; no downstream checks.
pub async fn health() -> Json<Health> {
    Json(Health { alive: true })
}

pub async fn hello() -> Json<Hello> {
    Json(Hello { hello: "world!" })
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn call(router: Router, path: &str) -> (StatusCode, String, Option<String>) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_owned());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
    }

    #[tokio::test]
    async fn hello_returns_world() {
        let router = Router::new().route("/hello", get(hello));

        let (status, body, content_type) = call(router, "/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"hello":"world!"}"#);
        assert_eq!(content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn health_is_alive() {
        let router = Router::new().route(HEALTH_PATH, get(health));

        let (status, body, _) = call(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"alive":true}"#);
    }

    #[tokio::test]
    async fn version_reports_injected_values() {
        let router = Router::new()
            .route("/", get(version))
            .with_state(Arc::new(VersionInfo::new("app", "1.2.3")));

        let (status, body, _) = call(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"application":"app","version":"1.2.3"}"#);
    }

    #[tokio::test]
    async fn handlers_are_idempotent() {
        let router = Router::new()
            .route("/", get(version))
            .route("/hello", get(hello))
            .route(HEALTH_PATH, get(health))
            .with_state(Arc::new(VersionInfo::current()));

        for path in ["/", "/hello", "/health"] {
            let first = call(router.clone(), path).await;
            let second = call(router.clone(), path).await;
            assert_eq!(first, second, "{path} changed between calls");
        }
    }

    #[test]
    fn build_version_defaults_to_unknown() {
        let info = VersionInfo::current();
        assert_eq!(info.application, "app");
        match option_env!("APP_VERSION") {
            Some(v) => assert_eq!(info.version, v),
            None => assert_eq!(info.version, "unknown"),
        }
    }
}
