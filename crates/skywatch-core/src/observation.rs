//! The structured observations observers submit.
//!
//! A scan covers one system but only the positions it explicitly enumerates.
//! Positions missing from the map were not observed; they are never taken as
//! evidence that anything left.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  body::{BodyFields, BodyKind},
  coords::{SystemId, UniverseBounds},
  error::check_id,
};

/// One body as an observer saw it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedBody {
  /// The game's internal id, when the page exposed it.
  #[serde(default)]
  pub source_id:  Option<i64>,
  #[serde(default)]
  pub name:       Option<String>,
  #[serde(default)]
  pub owner_id:   Option<i64>,
  #[serde(default)]
  pub owner_name: Option<String>,
}

impl ObservedBody {
  pub fn validate(&self) -> Result<()> {
    check_id("source_id", self.source_id)?;
    check_id("owner_id", self.owner_id)
  }

  /// The attributes to merge into the canonical row. Blank names are
  /// treated as not observed.
  pub fn fields(&self) -> BodyFields {
    BodyFields {
      owner_id:   self.owner_id,
      owner_name: non_blank(self.owner_name.as_deref()),
      source_id:  self.source_id,
      name:       non_blank(self.name.as_deref()),
    }
  }
}

/// What was seen at one enumerated position. `None` means the slot was
/// observed to be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionObservation {
  #[serde(default)]
  pub planet: Option<ObservedBody>,
  #[serde(default)]
  pub moon:   Option<ObservedBody>,
}

impl PositionObservation {
  pub fn get(&self, kind: BodyKind) -> Option<&ObservedBody> {
    match kind {
      BodyKind::Planet => self.planet.as_ref(),
      BodyKind::Moon => self.moon.as_ref(),
    }
  }
}

/// A snapshot of (part of) one system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionScan {
  pub region:      SystemId,
  /// When the observer took the snapshot. Defaults to the time of
  /// submission; future timestamps are clamped to it.
  #[serde(default)]
  pub observed_at: Option<DateTime<Utc>>,
  /// Enumerated positions, keyed by position number.
  pub positions:   BTreeMap<u8, PositionObservation>,
}

impl RegionScan {
  pub fn new(region: SystemId) -> Self {
    Self { region, observed_at: None, positions: BTreeMap::new() }
  }

  /// Builder-style helper: record what was seen at `position`.
  pub fn with_position(
    mut self,
    position: u8,
    planet: Option<ObservedBody>,
    moon: Option<ObservedBody>,
  ) -> Self {
    self.positions.insert(position, PositionObservation { planet, moon });
    self
  }

  /// Reject the whole scan if any part of it is malformed. Nothing is
  /// written for a scan that fails here.
  pub fn validate(&self, bounds: &UniverseBounds) -> Result<()> {
    bounds.check_system(self.region)?;
    for (position, observed) in &self.positions {
      bounds.check_position(*position)?;
      for kind in BodyKind::ALL {
        if let Some(body) = observed.get(kind) {
          body.validate()?;
        }
      }
    }
    Ok(())
  }

  /// `true` when fewer positions were enumerated than the system holds.
  pub fn is_partial(&self, bounds: &UniverseBounds) -> bool {
    self.positions.len() < usize::from(bounds.positions)
  }
}

fn non_blank(s: Option<&str>) -> Option<String> {
  s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[test]
  fn blank_names_are_not_observed() {
    let body = ObservedBody {
      name: Some("   ".into()),
      owner_name: Some(" Vega ".into()),
      ..Default::default()
    };
    let fields = body.fields();
    assert_eq!(fields.name, None);
    assert_eq!(fields.owner_name.as_deref(), Some("Vega"));
  }

  #[test]
  fn validate_rejects_bad_position_and_ids() {
    let bounds = UniverseBounds::default();
    let scan = RegionScan::new(SystemId::new(1, 1)).with_position(16, None, None);
    assert!(matches!(scan.validate(&bounds), Err(Error::PositionOutOfRange { .. })));

    let scan = RegionScan::new(SystemId::new(1, 1)).with_position(
      3,
      Some(ObservedBody { source_id: Some(-4), ..Default::default() }),
      None,
    );
    assert!(matches!(scan.validate(&bounds), Err(Error::NonPositiveId { .. })));

    let scan = RegionScan::new(SystemId::new(10, 1));
    assert!(matches!(scan.validate(&bounds), Err(Error::GalaxyOutOfRange { .. })));
  }

  #[test]
  fn positions_deserialize_from_string_keys() {
    let scan: RegionScan = serde_json::from_value(serde_json::json!({
      "region": { "galaxy": 1, "system": 42 },
      "positions": {
        "3": { "planet": { "source_id": 500, "name": "Home" } },
        "7": {}
      }
    }))
    .unwrap();
    assert_eq!(scan.positions.len(), 2);
    assert_eq!(scan.positions[&3].planet.as_ref().unwrap().source_id, Some(500));
    assert!(scan.positions[&7].planet.is_none());
  }
}
