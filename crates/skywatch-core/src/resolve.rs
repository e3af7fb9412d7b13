//! Identity resolution between a submitted body and the canonical row at the
//! same natural key.
//!
//! Source ids win over names: names are player-editable, ids are not. When
//! either side lacks an id the resolver falls back to the name and treats any
//! mismatch as a replacement rather than guessing at a rename.

use serde::{Deserialize, Serialize};

use crate::{body::CelestialBody, observation::ObservedBody};

/// How a submission relates to the canonical row at its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
  Unchanged,
  Renamed,
  Replaced,
  New,
  Departed,
}

/// Classify one enumerated slot.
///
/// `existing` may be any stored row; rows marked deleted are not live and
/// behave as if absent. Returns `None` when the slot was empty before and is
/// empty now.
pub fn resolve(
  submitted: Option<&ObservedBody>,
  existing: Option<&CelestialBody>,
) -> Option<Resolution> {
  let existing = existing.filter(|b| b.status.is_live());

  match (submitted, existing) {
    (None, None) => None,
    (Some(_), None) => Some(Resolution::New),
    (None, Some(_)) => Some(Resolution::Departed),
    (Some(s), Some(e)) => Some(match (s.source_id, e.source_id) {
      (Some(a), Some(b)) if a == b => {
        if names_differ(s.name.as_deref(), e.name.as_deref()) {
          Resolution::Renamed
        } else {
          Resolution::Unchanged
        }
      }
      (Some(_), Some(_)) => Resolution::Replaced,
      _ => {
        if normalized(s.name.as_deref()) == normalized(e.name.as_deref()) {
          Resolution::Unchanged
        } else {
          Resolution::Replaced
        }
      }
    }),
  }
}

/// With matching ids, a missing submitted name is "not observed", not drift.
fn names_differ(submitted: Option<&str>, existing: Option<&str>) -> bool {
  match normalized(submitted) {
    Some(name) => Some(name) != normalized(existing),
    None => false,
  }
}

fn normalized(name: Option<&str>) -> Option<&str> {
  name.map(str::trim).filter(|n| !n.is_empty())
}
