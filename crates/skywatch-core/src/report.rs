//! Externally-identified event reports.
//!
//! A report's identity is `(kind, external_id)` and never changes. Every
//! other field is refinable: a later delivery of the same report overwrites
//! the fields it carries and leaves the rest alone. Payload fields are all
//! optional and omitted from the serialised form when absent, so a partial
//! delivery can never blank a value an earlier one supplied.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  body::BodyKind,
  coords::{Coordinates, UniverseBounds},
  error::check_id,
};

/// Unit type → amount (resources, ships, buildings, research levels).
pub type Amounts = BTreeMap<String, i64>;

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
  /// Reconnaissance of a target position.
  Espionage,
  /// Combat outcome.
  Battle,
  /// Debris-field salvage.
  Recycle,
  /// Exploration voyage outcome.
  Expedition,
  /// Someone else spied on one of our positions.
  HostileEspionage,
}

impl ReportKind {
  pub const ALL: [ReportKind; 5] = [
    ReportKind::Espionage,
    ReportKind::Battle,
    ReportKind::Recycle,
    ReportKind::Expedition,
    ReportKind::HostileEspionage,
  ];

  /// The discriminant stored in the `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Espionage => "espionage",
      Self::Battle => "battle",
      Self::Recycle => "recycle",
      Self::Expedition => "expedition",
      Self::HostileEspionage => "hostile_espionage",
    }
  }
}

impl fmt::Display for ReportKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ReportKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|k| k.as_str() == s)
      .ok_or_else(|| Error::UnknownReportKind(s.to_owned()))
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionagePayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resources: Option<Amounts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub buildings: Option<Amounts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub research:  Option<Amounts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fleet:     Option<Amounts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub defense:   Option<Amounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattlePayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attacker_lost:  Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub defender_lost:  Option<i64>,
  /// Plunder.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metal:          Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub crystal:        Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deuterium:      Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debris_metal:   Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub debris_crystal: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecyclePayload {
  /// Collected.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metal:          Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub crystal:        Option<i64>,
  /// Present in the debris field when the recyclers arrived.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub field_metal:    Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub field_crystal:  Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionPayload {
  /// Outcome class, e.g. `resources`, `fleet`, `nothing`, `pirates`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub outcome:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resources: Option<Amounts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fleet:     Option<Amounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostileEspionagePayload {
  /// Where the spies came from. The spied-on position is the report target.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attacker: Option<Coordinates>,
}

/// The typed payload of a report. The variant name doubles as the report's
/// kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ReportPayload {
  Espionage(EspionagePayload),
  Battle(BattlePayload),
  Recycle(RecyclePayload),
  Expedition(ExpeditionPayload),
  HostileEspionage(HostileEspionagePayload),
}

impl ReportPayload {
  pub fn kind(&self) -> ReportKind {
    match self {
      Self::Espionage(_) => ReportKind::Espionage,
      Self::Battle(_) => ReportKind::Battle,
      Self::Recycle(_) => ReportKind::Recycle,
      Self::Expedition(_) => ReportKind::Expedition,
      Self::HostileEspionage(_) => ReportKind::HostileEspionage,
    }
  }

  /// Serialise the inner payload (without the kind tag) for storage.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or_else(|| serde_json::json!({})))
  }

  /// Rebuild from the stored kind and inner payload.
  pub fn from_parts(kind: ReportKind, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_str(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }

  fn validate(&self, bounds: &UniverseBounds) -> Result<()> {
    let negative = |name: &str, v: Option<i64>| match v {
      Some(v) if v < 0 => Err(Error::InvalidPayload(format!("{name} is negative: {v}"))),
      _ => Ok(()),
    };
    match self {
      Self::Battle(b) => {
        negative("attacker_lost", b.attacker_lost)?;
        negative("defender_lost", b.defender_lost)?;
        negative("metal", b.metal)?;
        negative("crystal", b.crystal)?;
        negative("deuterium", b.deuterium)?;
        negative("debris_metal", b.debris_metal)?;
        negative("debris_crystal", b.debris_crystal)
      }
      Self::Recycle(r) => {
        negative("metal", r.metal)?;
        negative("crystal", r.crystal)?;
        negative("field_metal", r.field_metal)?;
        negative("field_crystal", r.field_crystal)
      }
      Self::HostileEspionage(h) => match h.attacker {
        Some(c) => bounds.check(c),
        None => Ok(()),
      },
      Self::Espionage(_) | Self::Expedition(_) => Ok(()),
    }
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// One delivery of a report. Input to
/// [`crate::store::ObservationStore::upsert_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
  /// The game's message id; unique per kind.
  pub external_id: i64,
  /// The position the report is about, if any.
  #[serde(default)]
  pub target:      Option<Coordinates>,
  #[serde(default)]
  pub body_kind:   Option<BodyKind>,
  /// The player who delivered it.
  #[serde(default)]
  pub reported_by: Option<i64>,
  /// The in-game time of the event.
  #[serde(default)]
  pub report_time: Option<DateTime<Utc>>,
  pub payload:     ReportPayload,
}

impl NewReport {
  pub fn new(external_id: i64, payload: ReportPayload) -> Self {
    Self {
      external_id,
      target: None,
      body_kind: None,
      reported_by: None,
      report_time: None,
      payload,
    }
  }

  pub fn kind(&self) -> ReportKind { self.payload.kind() }

  pub fn key(&self) -> ReportKey { ReportKey::new(self.kind(), self.external_id) }

  pub fn validate(&self, bounds: &UniverseBounds) -> Result<()> {
    check_id("external_id", Some(self.external_id))?;
    check_id("reported_by", self.reported_by)?;
    if let Some(target) = self.target {
      bounds.check(target)?;
    }
    self.payload.validate(bounds)
  }
}

// ─── Stored ──────────────────────────────────────────────────────────────────

/// The identity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportKey {
  pub kind:        ReportKind,
  pub external_id: i64,
}

impl ReportKey {
  pub fn new(kind: ReportKind, external_id: i64) -> Self { Self { kind, external_id } }
}

impl fmt::Display for ReportKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.external_id)
  }
}

impl FromStr for ReportKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let (kind, id) = s
      .rsplit_once(':')
      .ok_or_else(|| Error::UnknownReportKind(s.to_owned()))?;
    let external_id = id.parse().map_err(|_| Error::UnknownReportKind(s.to_owned()))?;
    Ok(Self::new(kind.parse()?, external_id))
  }
}

/// The single stored row for a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  pub kind:        ReportKind,
  pub external_id: i64,
  pub target:      Option<Coordinates>,
  pub body_kind:   Option<BodyKind>,
  pub reported_by: Option<i64>,
  pub report_time: Option<DateTime<Utc>>,
  pub payload:     ReportPayload,
  /// Bumped only when a delivery actually changed a stored field.
  pub revision:    u32,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Report {
  pub fn key(&self) -> ReportKey { ReportKey::new(self.kind, self.external_id) }
}

/// What a delivery did to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
  Inserted,
  Updated,
  /// The delivery matched stored state exactly; nothing was written.
  Unchanged,
}

/// Acknowledgement returned for every accepted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
  pub kind:        ReportKind,
  pub external_id: i64,
  pub outcome:     ReportOutcome,
  pub revision:    u32,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::ObservationStore::find_reports`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
  pub kind:        Option<ReportKind>,
  pub galaxy:      Option<u16>,
  pub system:      Option<u16>,
  pub position:    Option<u8>,
  pub reported_by: Option<i64>,
  /// Inclusive lower bound on the report time (creation time when unknown).
  pub since:       Option<DateTime<Utc>>,
  /// Exclusive upper bound, same clock as `since`.
  pub until:       Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn payload_json_omits_missing_fields() {
    let payload = ReportPayload::Battle(BattlePayload {
      metal: Some(150),
      ..Default::default()
    });
    assert_eq!(payload.to_json().unwrap(), serde_json::json!({ "metal": 150 }));

    let back = ReportPayload::from_parts(ReportKind::Battle, serde_json::json!({ "metal": 150 }))
      .unwrap();
    assert_eq!(back, payload);
  }

  #[test]
  fn validation() {
    let bounds = UniverseBounds::default();
    let ok = NewReport::new(42, ReportPayload::Battle(BattlePayload::default()));
    assert!(ok.validate(&bounds).is_ok());

    let zero = NewReport::new(0, ReportPayload::Battle(BattlePayload::default()));
    assert!(matches!(zero.validate(&bounds), Err(Error::NonPositiveId { .. })));

    let mut off_map = ok.clone();
    off_map.target = Some(Coordinates::new(1, 1, 20));
    assert!(matches!(off_map.validate(&bounds), Err(Error::PositionOutOfRange { .. })));

    let negative = NewReport::new(
      1,
      ReportPayload::Recycle(RecyclePayload { metal: Some(-1), ..Default::default() }),
    );
    assert!(matches!(negative.validate(&bounds), Err(Error::InvalidPayload(_))));
  }

  #[test]
  fn keys_parse_with_underscored_kinds() {
    let key: ReportKey = "hostile_espionage:9001".parse().unwrap();
    assert_eq!(key, ReportKey::new(ReportKind::HostileEspionage, 9001));
    assert_eq!(key.to_string(), "hostile_espionage:9001");
    assert!("battle".parse::<ReportKey>().is_err());
    assert!("raid:1".parse::<ReportKey>().is_err());
  }
}
