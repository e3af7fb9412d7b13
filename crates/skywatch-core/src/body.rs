//! Canonical celestial bodies and the merge policy applied to them.
//!
//! A body is identified by its natural key (coordinates plus kind), never by
//! a surrogate id. Rows are never physically removed: a departure flips the
//! status to [`BodyStatus::Deleted`] so reports that reference the position
//! stay resolvable.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, coords::Coordinates};

// ─── Kind & status ───────────────────────────────────────────────────────────

/// Which of the two slots at a position a body occupies.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
  /// The primary body at a position.
  Planet,
  /// The satellite orbiting the planet at a position.
  Moon,
}

impl BodyKind {
  pub const ALL: [BodyKind; 2] = [BodyKind::Planet, BodyKind::Moon];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Planet => "planet",
      Self::Moon => "moon",
    }
  }
}

impl fmt::Display for BodyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BodyKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "planet" => Ok(Self::Planet),
      "moon" => Ok(Self::Moon),
      other => Err(Error::UnknownBodyKind(other.to_owned())),
    }
  }
}

/// Lifecycle of a canonical body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyStatus {
  /// Created by the most recent write and not observed since.
  New,
  /// Observed again after creation.
  Seen,
  /// Confirmed gone by an explicit departure.
  Deleted,
}

impl BodyStatus {
  pub fn is_live(self) -> bool { !matches!(self, Self::Deleted) }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Seen => "seen",
      Self::Deleted => "deleted",
    }
  }
}

impl FromStr for BodyStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "new" => Ok(Self::New),
      "seen" => Ok(Self::Seen),
      "deleted" => Ok(Self::Deleted),
      other => Err(Error::UnknownBodyStatus(other.to_owned())),
    }
  }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The natural key of a canonical body.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BodyKey {
  pub coordinates: Coordinates,
  pub kind:        BodyKind,
}

impl BodyKey {
  pub fn new(coordinates: Coordinates, kind: BodyKind) -> Self {
    Self { coordinates, kind }
  }
}

impl fmt::Display for BodyKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.coordinates, self.kind)
  }
}

// ─── Body ────────────────────────────────────────────────────────────────────

/// The single stored record representing current best-known truth for one
/// natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelestialBody {
  pub coordinates: Coordinates,
  pub kind:        BodyKind,
  /// Owning player, if known.
  pub owner_id:    Option<i64>,
  /// Owner display name, joined from the owner directory on read.
  pub owner_name:  Option<String>,
  /// The game's internal id for the body; the strongest identity signal.
  pub source_id:   Option<i64>,
  pub name:        Option<String>,
  pub status:      BodyStatus,
  pub created_at:  DateTime<Utc>,
  /// Last time any stored field changed. Never moves backwards.
  pub updated_at:  DateTime<Utc>,
}

impl CelestialBody {
  pub fn key(&self) -> BodyKey { BodyKey::new(self.coordinates, self.kind) }

  /// Pure rendition of the store's merge policy.
  ///
  /// Returns the row that should exist for `key` after `op` has been applied
  /// on top of `existing` at time `at`, or `None` when no row exists before
  /// or after. Storage backends must produce the same result atomically.
  ///
  /// When the op changes nothing, `existing` is returned untouched,
  /// including its `updated_at`, so repeated identical observations are
  /// invisible in storage.
  pub fn apply(
    existing: Option<&CelestialBody>,
    key: BodyKey,
    op: &BodyOp,
    at: DateTime<Utc>,
  ) -> Option<CelestialBody> {
    let Some(current) = existing else {
      return match op {
        BodyOp::MarkDeleted => None,
        BodyOp::Insert(fields) | BodyOp::MergeFields(fields) => {
          Some(CelestialBody {
            coordinates: key.coordinates,
            kind:        key.kind,
            owner_id:    fields.owner_id,
            owner_name:  fields.owner_name.clone(),
            source_id:   fields.source_id,
            name:        fields.name.clone(),
            status:      BodyStatus::New,
            created_at:  at,
            updated_at:  at,
          })
        }
      };
    };

    let mut next = current.clone();
    match op {
      BodyOp::Insert(fields) => {
        next.owner_name = if fields.owner_id == current.owner_id {
          fields.owner_name.clone().or_else(|| current.owner_name.clone())
        } else {
          fields.owner_name.clone()
        };
        next.owner_id = fields.owner_id;
        next.source_id = fields.source_id;
        next.name = fields.name.clone();
        next.status = BodyStatus::Seen;
      }
      BodyOp::MergeFields(fields) => {
        if fields.owner_id.is_some() && fields.owner_id != current.owner_id {
          next.owner_name = fields.owner_name.clone();
        } else if fields.owner_name.is_some() {
          next.owner_name = fields.owner_name.clone();
        }
        next.owner_id = fields.owner_id.or(current.owner_id);
        next.source_id = fields.source_id.or(current.source_id);
        next.name = fields.name.clone().or_else(|| current.name.clone());
        next.status = BodyStatus::Seen;
      }
      BodyOp::MarkDeleted => next.status = BodyStatus::Deleted,
    }

    if next == *current {
      return Some(next);
    }
    next.updated_at = current.updated_at.max(at);
    Some(next)
  }
}

// ─── Write operations ────────────────────────────────────────────────────────

/// Caller-supplied body attributes. `None` means "not observed", never
/// "clear this field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyFields {
  pub owner_id:   Option<i64>,
  pub owner_name: Option<String>,
  pub source_id:  Option<i64>,
  pub name:       Option<String>,
}

/// One atomic write against a single natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "fields", rename_all = "snake_case")]
pub enum BodyOp {
  /// A new identity takes the key. Creates a `new` row on an empty key;
  /// on an occupied (or previously deleted) key replaces every identity
  /// field and marks the row `seen`.
  Insert(BodyFields),
  /// The same identity was observed again. Only supplied fields overwrite;
  /// status becomes `seen`.
  MergeFields(BodyFields),
  /// Confirmed departure. Fields are kept for history.
  MarkDeleted,
}
