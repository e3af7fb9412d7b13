//! The seam between source-specific parsing and the core.
//!
//! The core never reads pages or message text. Each source gets its own
//! [`ObservationExtractor`] that turns whatever it captured into structured
//! [`Observation`]s.

use serde::{Deserialize, Serialize};

use crate::{observation::RegionScan, report::NewReport};

/// One structured observation, ready for ingestion.
///
/// Externally tagged (`{"scan": {..}}`) so scan position maps deserialize
/// without buffering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
  Scan(RegionScan),
  Report(NewReport),
}

/// Turns a captured source document into observations.
pub trait ObservationExtractor {
  type Source: ?Sized;
  type Error: std::error::Error + Send + Sync + 'static;

  fn extract(&self, source: &Self::Source) -> Result<Vec<Observation>, Self::Error>;
}
