//! Handler-level errors and their HTTP rendering.
//!
//! Every error response carries a [`ResponseError`] extension so the request
//! logger can report the underlying message, not just the status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("route not found")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error message attached to a response for the request logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}

/// JSON error body `{"message": <reason>}` plus the logging extension.
fn error_response(status: StatusCode, err: String) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut response = (status, Json(json!({ "message": reason }))).into_response();
    response.extensions_mut().insert(ResponseError(err));
    response
}
