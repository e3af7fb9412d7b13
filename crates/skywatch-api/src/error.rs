//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use skywatch_core::ingest::IngestError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Transient; the client should retry the same request.
  #[error("store unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl<E> From<IngestError<E>> for ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn from(err: IngestError<E>) -> Self {
    match err {
      IngestError::Invalid(e) => ApiError::BadRequest(e.to_string()),
      IngestError::Unavailable(e) => ApiError::Unavailable(Box::new(e)),
      IngestError::Storage(e) => ApiError::Store(Box::new(e)),
    }
  }
}

/// Malformed or mistyped request bodies are the client's fault, whatever
/// status axum would pick for them.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable(e) => {
        let body = json!({ "error": e.to_string(), "retryable": true });
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
      }
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
