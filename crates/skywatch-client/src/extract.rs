//! Extractor for documents that already hold structured observations.

use serde_json::Value;
use skywatch_core::extract::{Observation, ObservationExtractor};

/// Accepts a single observation, an array of them, or an object with an
/// `observations` array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExtractor;

impl ObservationExtractor for JsonExtractor {
  type Error = serde_json::Error;
  type Source = str;

  // Buffered (untagged) content cannot parse the numeric `positions` keys.
  fn extract(&self, source: &str) -> Result<Vec<Observation>, Self::Error> {
    let mut doc: Value = serde_json::from_str(source)?;
    if let Some(inner) = doc.get_mut("observations").map(Value::take) {
      doc = inner;
    }
    if doc.is_array() {
      serde_json::from_value(doc)
    } else {
      Ok(vec![serde_json::from_value(doc)?])
    }
  }
}
