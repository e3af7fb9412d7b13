//! Error type for `skywatch-client`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with a non-success status.
  #[error("{what} → {status}: {body}")]
  Status {
    what:   String,
    status: reqwest::StatusCode,
    body:   String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Core(#[from] skywatch_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
