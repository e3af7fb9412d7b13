//! Error type for `skywatch-store-sqlite`.

use rusqlite::ErrorCode;
use skywatch_core::Retryable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] skywatch_core::Error),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(own) => *own,
        Err(inner) => Self::Database(tokio_rusqlite::Error::Other(inner)),
      },
      err => Self::Database(err),
    }
  }
}

impl Retryable for Error {
  /// Lock contention and a closed connection clear up on their own; anything
  /// else (constraint violations, corrupt rows) will fail the same way again.
  fn is_retryable(&self) -> bool {
    match self {
      Self::Database(tokio_rusqlite::Error::ConnectionClosed) => true,
      Self::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))) => {
        matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
      }
      _ => false,
    }
  }
}
