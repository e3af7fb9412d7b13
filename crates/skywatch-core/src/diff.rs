//! Scan diff pipeline: incoming system scan → change events + store writes.
//!
//! Only enumerated positions are evaluated. Each body kind at a position is
//! resolved on its own, so a moon can arrive while the planet is unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  body::{BodyKey, BodyKind, BodyOp, CelestialBody},
  coords::Coordinates,
  observation::{ObservedBody, RegionScan},
  resolve::{Resolution, resolve},
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// The identity attributes carried on an event, so the audit trail keeps
/// both sides of a replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyIdentity {
  pub source_id: Option<i64>,
  pub name:      Option<String>,
  pub owner_id:  Option<i64>,
}

impl From<&CelestialBody> for BodyIdentity {
  fn from(b: &CelestialBody) -> Self {
    Self { source_id: b.source_id, name: b.name.clone(), owner_id: b.owner_id }
  }
}

impl From<&ObservedBody> for BodyIdentity {
  fn from(o: &ObservedBody) -> Self {
    let fields = o.fields();
    Self { source_id: fields.source_id, name: fields.name, owner_id: fields.owner_id }
  }
}

/// A meaningful change at one natural key.
///
/// A replacement is two events: the departure of the old identity followed
/// by the arrival of the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiffEvent {
  Arrival {
    coordinates: Coordinates,
    kind:        BodyKind,
    body:        BodyIdentity,
  },
  Departure {
    coordinates: Coordinates,
    kind:        BodyKind,
    body:        BodyIdentity,
  },
  Rename {
    coordinates: Coordinates,
    kind:        BodyKind,
    source_id:   Option<i64>,
    from:        Option<String>,
    to:          Option<String>,
  },
}

impl DiffEvent {
  pub fn key(&self) -> BodyKey {
    match self {
      Self::Arrival { coordinates, kind, .. }
      | Self::Departure { coordinates, kind, .. }
      | Self::Rename { coordinates, kind, .. } => BodyKey::new(*coordinates, *kind),
    }
  }

  /// The discriminant string stored alongside the event.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Arrival { .. } => "arrival",
      Self::Departure { .. } => "departure",
      Self::Rename { .. } => "rename",
    }
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// One store write plus the events it realises. The store plans, applies and
/// logs it in one transaction, so an event is only ever recorded for a write
/// that landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyWrite {
  pub key:    BodyKey,
  pub op:     BodyOp,
  pub events: Vec<DiffEvent>,
}

// ─── Detection ───────────────────────────────────────────────────────────────

/// Compute the writes that bring `current` (every stored row for the scanned
/// system, any status) in line with `scan`.
///
/// Keys that were empty and are still empty produce nothing. Keys in
/// positions the scan did not enumerate are never touched.
pub fn detect(scan: &RegionScan, current: &[CelestialBody]) -> Vec<BodyWrite> {
  let by_key: HashMap<BodyKey, &CelestialBody> =
    current.iter().map(|b| (b.key(), b)).collect();

  scanned_keys(scan)
    .filter_map(|(key, submitted)| plan(key, submitted, by_key.get(&key).copied()))
    .collect()
}

/// Every natural key the scan speaks for, with what it saw there, in
/// position order and planet before moon.
pub fn scanned_keys(
  scan: &RegionScan,
) -> impl Iterator<Item = (BodyKey, Option<&ObservedBody>)> {
  scan.positions.iter().flat_map(move |(&position, observed)| {
    let coordinates = scan.region.at(position);
    BodyKind::ALL
      .into_iter()
      .map(move |kind| (BodyKey::new(coordinates, kind), observed.get(kind)))
  })
}

/// The write for one key, given what was submitted and the row stored there
/// right now. `None` when the key needs no write at all.
///
/// Stores call this while holding the key's row, so the events describe the
/// transition that is actually applied.
pub fn plan(
  key: BodyKey,
  submitted: Option<&ObservedBody>,
  existing: Option<&CelestialBody>,
) -> Option<BodyWrite> {
  let resolution = resolve(submitted, existing)?;
  let coordinates = key.coordinates;
  let kind = key.kind;

  let (op, events) = match (resolution, submitted, existing) {
    (Resolution::Unchanged, Some(s), _) => (BodyOp::MergeFields(s.fields()), vec![]),
    (Resolution::Renamed, Some(s), Some(e)) => {
      let fields = s.fields();
      let event = DiffEvent::Rename {
        coordinates,
        kind,
        source_id: e.source_id,
        from: e.name.clone(),
        to: fields.name.clone(),
      };
      (BodyOp::MergeFields(fields), vec![event])
    }
    (Resolution::Replaced, Some(s), Some(e)) => (
      BodyOp::Insert(s.fields()),
      vec![
        DiffEvent::Departure { coordinates, kind, body: BodyIdentity::from(e) },
        DiffEvent::Arrival { coordinates, kind, body: BodyIdentity::from(s) },
      ],
    ),
    (Resolution::New, Some(s), _) => (
      BodyOp::Insert(s.fields()),
      vec![DiffEvent::Arrival { coordinates, kind, body: BodyIdentity::from(s) }],
    ),
    (Resolution::Departed, None, Some(e)) => (
      BodyOp::MarkDeleted,
      vec![DiffEvent::Departure { coordinates, kind, body: BodyIdentity::from(e) }],
    ),
    // `resolve` never pairs a resolution with the wrong presence of sides.
    _ => return None,
  };

  Some(BodyWrite { key, op, events })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
