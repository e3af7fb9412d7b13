//! Error types for `skywatch-core`.
//!
//! Everything here is a validation failure: the submission was rejected before
//! any write was attempted. Storage failures are reported through the backend's
//! own error type (see [`crate::store::ObservationStore::Error`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed coordinates: {0:?}")]
  MalformedCoordinates(String),

  #[error("galaxy {galaxy} is outside 1..={max}")]
  GalaxyOutOfRange { galaxy: u16, max: u16 },

  #[error("system {system} is outside 1..={max}")]
  SystemOutOfRange { system: u16, max: u16 },

  #[error("position {position} is outside 1..={max}")]
  PositionOutOfRange { position: u8, max: u8 },

  #[error("unknown body kind: {0:?}")]
  UnknownBodyKind(String),

  #[error("unknown body status: {0:?}")]
  UnknownBodyStatus(String),

  #[error("unknown report kind: {0:?}")]
  UnknownReportKind(String),

  #[error("unknown region: {0:?}")]
  UnknownRegion(String),

  #[error("invalid {field}: {value} (must be positive)")]
  NonPositiveId { field: &'static str, value: i64 },

  #[error("invalid report payload: {0}")]
  InvalidPayload(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Storage errors that may succeed on a plain retry.
///
/// Every write path in this crate is idempotent, so callers can retry any
/// operation whose error reports `true` here without further coordination.
pub trait Retryable {
  fn is_retryable(&self) -> bool;
}

/// Reject ids that are zero or negative; the game never hands those out.
pub(crate) fn check_id(field: &'static str, value: Option<i64>) -> Result<()> {
  match value {
    Some(v) if v <= 0 => Err(Error::NonPositiveId { field, value: v }),
    _ => Ok(()),
  }
}
