//! Per-request audit logging.
//!
//! One record per request after the response is produced: `request` at INFO
//! for successes, `request_error` at ERROR (with `err`) for 4xx/5xx.
//! Requests routed to `/health` are not logged.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::http::error::ResponseError;
use crate::http::handlers::HEALTH_PATH;
use crate::http::request::{request_id, X_REQUEST_ID};
use crate::observability::logging::Logger;

/// Everything logged about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLogRecord {
    pub uri: String,
    pub status: u16,
    pub method: String,
    pub host: String,
    pub remote_ip: String,
    pub request_id: String,
    pub latency: Duration,
    pub user_agent: String,
    pub error: Option<String>,
}

impl RequestLogRecord {
    /// Emit the record through `logger`.
    pub fn emit(&self, logger: &Logger) {
        logger.in_scope(|| match &self.error {
            None => tracing::info!(
                uri = %self.uri,
                status = self.status,
                method = %self.method,
                host = %self.host,
                remote_ip = %self.remote_ip,
                request_id = %self.request_id,
                latency = ?self.latency,
                user_agent = %self.user_agent,
                "request"
            ),
            Some(err) => tracing::error!(
                uri = %self.uri,
                status = self.status,
                method = %self.method,
                host = %self.host,
                remote_ip = %self.remote_ip,
                request_id = %self.request_id,
                latency = ?self.latency,
                user_agent = %self.user_agent,
                err = %err,
                "request_error"
            ),
        });
    }
}

/// Request-side fields, captured before the request is consumed.
struct RequestFields {
    uri: String,
    method: String,
    host: String,
    remote_ip: String,
    request_id: Option<String>,
    user_agent: String,
}

impl RequestFields {
    fn capture(request: &Request<Body>) -> Self {
        let headers = request.headers();
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            uri: request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or_else(|| request.uri().to_string()),
            method: request.method().to_string(),
            host: header_str(headers, header::HOST)
                .map(str::to_owned)
                .or_else(|| request.uri().authority().map(|a| a.to_string()))
                .unwrap_or_default(),
            remote_ip: real_ip(headers).or(peer).unwrap_or_default(),
            request_id: request_id(request).map(str::to_owned),
            user_agent: header_str(headers, header::USER_AGENT)
                .unwrap_or_default()
                .to_owned(),
        }
    }

    fn into_record(self, response: &Response, latency: Duration) -> RequestLogRecord {
        let status = response.status();
        let error = (status.is_client_error() || status.is_server_error()).then(|| {
            response
                .extensions()
                .get::<ResponseError>()
                .map(|e| e.0.clone())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned())
        });
        let request_id = self
            .request_id
            .or_else(|| header_str(response.headers(), X_REQUEST_ID).map(str::to_owned))
            .unwrap_or_default();

        RequestLogRecord {
            uri: self.uri,
            status: status.as_u16(),
            method: self.method,
            host: self.host,
            remote_ip: self.remote_ip,
            request_id,
            latency,
            user_agent: self.user_agent,
            error,
        }
    }
}

fn header_str<K: header::AsHeaderName>(headers: &HeaderMap, key: K) -> Option<&str> {
    headers.get(key).and_then(|v| v.to_str().ok())
}

/// Client IP from proxy headers: first `X-Forwarded-For` hop, then `X-Real-IP`.
fn real_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return Some(first.to_owned());
        }
    }
    header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Middleware emitting one [`RequestLogRecord`] per request.
pub async fn log_requests(
    State(logger): State<Logger>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let skip = request
        .extensions()
        .get::<MatchedPath>()
        .is_some_and(|p| p.as_str() == HEALTH_PATH);
    if skip {
        return next.run(request).await;
    }

    let start = Instant::now();
    let fields = RequestFields::capture(&request);
    let response = next.run(request).await;

    fields.into_record(&response, start.elapsed()).emit(&logger);
    response
}
