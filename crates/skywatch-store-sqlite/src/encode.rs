//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings. Report payloads and
//! change-log events are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use skywatch_core::{
  body::{BodyKind, BodyStatus, CelestialBody},
  coords::Coordinates,
  diff::DiffEvent,
  freshness::{RegionFreshness, RegionId},
  report::{Report, ReportKind, ReportPayload},
  store::ChangeRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Always microsecond precision with a `Z` suffix, so that lexical order is
/// chronological order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `bodies` row joined with `owners`.
pub struct RawBody {
  pub galaxy:     u16,
  pub system:     u16,
  pub position:   u8,
  pub kind:       String,
  pub owner_id:   Option<i64>,
  pub owner_name: Option<String>,
  pub source_id:  Option<i64>,
  pub name:       Option<String>,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawBody {
  /// Column order expected by [`RawBody::from_row`].
  pub const COLUMNS: &'static str = "b.galaxy, b.system, b.position, b.kind, b.owner_id, o.name,
     b.source_id, b.name, b.status, b.created_at, b.updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      galaxy:     row.get(0)?,
      system:     row.get(1)?,
      position:   row.get(2)?,
      kind:       row.get(3)?,
      owner_id:   row.get(4)?,
      owner_name: row.get(5)?,
      source_id:  row.get(6)?,
      name:       row.get(7)?,
      status:     row.get(8)?,
      created_at: row.get(9)?,
      updated_at: row.get(10)?,
    })
  }

  pub fn into_body(self) -> Result<CelestialBody> {
    Ok(CelestialBody {
      coordinates: Coordinates::new(self.galaxy, self.system, self.position),
      kind:        self.kind.parse::<BodyKind>()?,
      owner_id:    self.owner_id,
      owner_name:  self.owner_name,
      source_id:   self.source_id,
      name:        self.name,
      status:      self.status.parse::<BodyStatus>()?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `body_events` row.
pub struct RawChange {
  pub event_id:    String,
  pub scan_id:     String,
  pub recorded_at: String,
  pub event_json:  String,
}

impl RawChange {
  pub fn into_change(self) -> Result<ChangeRecord> {
    let event: DiffEvent = serde_json::from_str(&self.event_json)?;
    Ok(ChangeRecord {
      event_id: decode_uuid(&self.event_id)?,
      scan_id: decode_uuid(&self.scan_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      event,
    })
  }
}

/// Raw values read from a `region_freshness` row.
pub struct RawFreshness {
  pub region:           String,
  pub last_observed_at: String,
}

impl RawFreshness {
  pub fn into_freshness(self) -> Result<RegionFreshness> {
    Ok(RegionFreshness {
      region:           self.region.parse::<RegionId>()?,
      last_observed_at: decode_dt(&self.last_observed_at)?,
    })
  }
}

/// Raw values read from a `reports` row.
pub struct RawReport {
  pub kind:        String,
  pub external_id: i64,
  pub galaxy:      Option<u16>,
  pub system:      Option<u16>,
  pub position:    Option<u8>,
  pub body_kind:   Option<String>,
  pub reported_by: Option<i64>,
  pub report_time: Option<String>,
  pub payload:     String,
  pub revision:    u32,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawReport {
  /// Column order expected by [`RawReport::from_row`].
  pub const COLUMNS: &'static str = "kind, external_id, galaxy, system, position, body_kind,
     reported_by, report_time, payload, revision, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      kind:        row.get(0)?,
      external_id: row.get(1)?,
      galaxy:      row.get(2)?,
      system:      row.get(3)?,
      position:    row.get(4)?,
      body_kind:   row.get(5)?,
      reported_by: row.get(6)?,
      report_time: row.get(7)?,
      payload:     row.get(8)?,
      revision:    row.get(9)?,
      created_at:  row.get(10)?,
      updated_at:  row.get(11)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    let kind = self.kind.parse::<ReportKind>()?;
    let data: serde_json::Value = serde_json::from_str(&self.payload)?;

    let target = match (self.galaxy, self.system, self.position) {
      (Some(g), Some(s), Some(p)) => Some(Coordinates::new(g, s, p)),
      _ => None,
    };

    Ok(Report {
      kind,
      external_id: self.external_id,
      target,
      body_kind: self.body_kind.as_deref().map(str::parse::<BodyKind>).transpose()?,
      reported_by: self.reported_by,
      report_time: self.report_time.as_deref().map(decode_dt).transpose()?,
      payload: ReportPayload::from_parts(kind, data)?,
      revision: self.revision,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
