//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"status":"error","message":...}`. Server faults are
//! logged in full and answered with a generic message.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message returned for every 500.
pub const INTERNAL_MESSAGE: &str = "Unable to process request";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Core(#[from] cir_core::Error),

  #[error("internal error: {0}")]
  Internal(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::Core(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
      ApiError::Core(e) => {
        error!(error = %e, detail = ?e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
      }
      ApiError::Internal(m) => {
        error!(error = %m, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
      }
    };
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
  }
}
