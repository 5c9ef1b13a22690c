//! Metrics collection and exposition.
//!
//! # Metrics
//! - `<subsystem>_requests_total` (counter): requests by code, method, host, url
//! - `<subsystem>_request_duration_seconds` (histogram): latency distribution
//! - `<subsystem>_response_size_bytes` (histogram): body sizes, when known up front
//!
//! # Design Decisions
//! - The Prometheus recorder is owned, never installed globally; samples are
//!   recorded through `metrics::with_local_recorder`
//! - `url` is the matched route pattern; 404s get an empty `url` so raw paths
//!   never become labels
//! - `/health` is not instrumented

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, HttpBody},
    extract::{MatchedPath, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::Label;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::http::handlers::HEALTH_PATH;

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

const SIZE_BUCKETS: &[f64] = &[
    1024.0,
    2048.0,
    5120.0,
    10240.0,
    102400.0,
    512000.0,
    1048576.0,
    2621440.0,
    5242880.0,
    10485760.0,
];

/// One completed request, as seen by the metrics layer.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub method: String,
    pub status: u16,
    pub host: String,
    pub url: String,
    pub elapsed: Duration,
    pub response_size: Option<u64>,
}

/// Request instrumentation backed by a private Prometheus recorder.
#[derive(Clone)]
pub struct RequestMetrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    requests_total: String,
    request_duration: String,
    response_size: String,
}

impl RequestMetrics {
    /// Create the recorder; every metric name is prefixed with `subsystem`.
    pub fn new(subsystem: &str) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("request_duration_seconds".to_string()),
                DURATION_BUCKETS,
            )?
            .set_buckets_for_metric(Matcher::Suffix("response_size_bytes".to_string()), SIZE_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
            requests_total: format!("{subsystem}_requests_total"),
            request_duration: format!("{subsystem}_request_duration_seconds"),
            response_size: format!("{subsystem}_response_size_bytes"),
        })
    }

    /// Record a completed request.
    pub fn record(&self, sample: &RequestSample) {
        let labels = vec![
            Label::new("code", sample.status.to_string()),
            Label::new("method", sample.method.clone()),
            Label::new("host", sample.host.clone()),
            Label::new("url", sample.url.clone()),
        ];

        metrics::with_local_recorder(&*self.recorder, || {
            metrics::counter!(self.requests_total.clone(), labels.clone()).increment(1);
            metrics::histogram!(self.request_duration.clone(), labels.clone())
                .record(sample.elapsed.as_secs_f64());
            if let Some(size) = sample.response_size {
                metrics::histogram!(self.response_size.clone(), labels).record(size as f64);
            }
        });
    }

    /// Render the Prometheus text exposition.
    pub fn render(&self) -> String {
        self.handle.run_upkeep();
        self.handle.render()
    }
}

impl std::fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMetrics")
            .field("requests_total", &self.requests_total)
            .finish_non_exhaustive()
    }
}

/// Middleware recording one sample per request.
pub async fn track_requests(
    State(metrics): State<RequestMetrics>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let matched = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());

    if matched.as_deref() == Some(HEALTH_PATH) {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().to_string();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let response = next.run(request).await;

    let status = response.status();
    let url = if status == StatusCode::NOT_FOUND {
        String::new()
    } else {
        matched.unwrap_or_default()
    };
    let response_size = response.body().size_hint().exact().or_else(|| {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    });

    metrics.record(&RequestSample {
        method,
        status: status.as_u16(),
        host,
        url,
        elapsed: start.elapsed(),
        response_size,
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: u16, url: &str) -> RequestSample {
        RequestSample {
            method: "GET".into(),
            status,
            host: "localhost".into(),
            url: url.into(),
            elapsed: Duration::from_millis(3),
            response_size: Some(42),
        }
    }

    #[test]
    fn renders_recorded_requests() {
        let metrics = RequestMetrics::new("app").unwrap();
        metrics.record(&sample(200, "/"));
        metrics.record(&sample(200, "/"));

        let text = metrics.render();
        let line = text
            .lines()
            .find(|l| l.starts_with("app_requests_total{"))
            .unwrap();
        assert!(line.contains(r#"code="200""#));
        assert!(line.contains(r#"method="GET""#));
        assert!(line.contains(r#"url="/""#));
        assert!(line.ends_with(" 2"));
        assert!(text.contains("app_request_duration_seconds_bucket"));
        assert!(text.contains(r#"le="0.005""#));
        assert!(text.contains("app_response_size_bytes_sum"));
    }

    #[test]
    fn recorders_are_independent() {
        let a = RequestMetrics::new("first").unwrap();
        let b = RequestMetrics::new("second").unwrap();
        a.record(&sample(404, ""));

        assert!(a.render().contains("first_requests_total"));
        assert!(!b.render().contains("first_requests_total"));
    }

    #[test]
    fn size_is_optional() {
        let metrics = RequestMetrics::new("app").unwrap();
        metrics.record(&RequestSample {
            response_size: None,
            ..sample(500, "/")
        });

        let text = metrics.render();
        assert!(text.contains("app_requests_total"));
        assert!(!text.contains("app_response_size_bytes"));
    }
}
