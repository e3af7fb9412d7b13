//! Per-region freshness and staleness classification.
//!
//! Only the raw `last_observed_at` timestamp is ever stored. Staleness is
//! recomputed on every read from the configured [`StalenessPolicy`], so the
//! bucket boundaries can change without touching stored data.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, coords::SystemId};

// ─── Regions ─────────────────────────────────────────────────────────────────

/// Named statistics categories; each one is refreshed by its own sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatCategory {
  Total,
  Fleet,
  Research,
  Buildings,
  Defense,
  Honor,
}

impl StatCategory {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Total => "total",
      Self::Fleet => "fleet",
      Self::Research => "research",
      Self::Buildings => "buildings",
      Self::Defense => "defense",
      Self::Honor => "honor",
    }
  }
}

impl FromStr for StatCategory {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "total" => Ok(Self::Total),
      "fleet" => Ok(Self::Fleet),
      "research" => Ok(Self::Research),
      "buildings" => Ok(Self::Buildings),
      "defense" => Ok(Self::Defense),
      "honor" => Ok(Self::Honor),
      other => Err(Error::UnknownRegion(other.to_owned())),
    }
  }
}

/// Anything whose freshness is tracked.
///
/// Serialised as its text key: `system:1:42` or `stats:fleet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RegionId {
  System(SystemId),
  Statistics(StatCategory),
}

/// Coarse region family, used to filter listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
  System,
  #[serde(rename = "stats")]
  Statistics,
}

impl RegionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::System => "system",
      Self::Statistics => "stats",
    }
  }
}

impl RegionId {
  pub fn kind(&self) -> RegionKind {
    match self {
      Self::System(_) => RegionKind::System,
      Self::Statistics(_) => RegionKind::Statistics,
    }
  }

  pub fn system(&self) -> Option<SystemId> {
    match self {
      Self::System(id) => Some(*id),
      Self::Statistics(_) => None,
    }
  }
}

impl fmt::Display for RegionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::System(id) => write!(f, "system:{}:{}", id.galaxy, id.system),
      Self::Statistics(c) => write!(f, "stats:{}", c.as_str()),
    }
  }
}

impl FromStr for RegionId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let unknown = || Error::UnknownRegion(s.to_owned());
    match s.split_once(':') {
      Some(("system", rest)) => {
        let (g, sys) = rest.split_once(':').ok_or_else(unknown)?;
        Ok(Self::System(SystemId::new(
          g.parse().map_err(|_| unknown())?,
          sys.parse().map_err(|_| unknown())?,
        )))
      }
      Some(("stats", category)) => {
        Ok(Self::Statistics(category.parse().map_err(|_| unknown())?))
      }
      _ => Err(unknown()),
    }
  }
}

impl TryFrom<String> for RegionId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<RegionId> for String {
  fn from(r: RegionId) -> Self { r.to_string() }
}

impl From<SystemId> for RegionId {
  fn from(id: SystemId) -> Self { Self::System(id) }
}

// ─── Stored freshness ────────────────────────────────────────────────────────

/// The persisted freshness row for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFreshness {
  pub region:           RegionId,
  /// Never decreases.
  pub last_observed_at: DateTime<Utc>,
}

// ─── Staleness ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
  Fresh,
  Medium,
  Old,
  VeryOld,
  /// Never observed.
  Unknown,
}

/// Upper bounds (exclusive) of the staleness buckets, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessPolicy {
  pub fresh_hours:  u32,
  pub medium_hours: u32,
  pub old_hours:    u32,
}

impl Default for StalenessPolicy {
  fn default() -> Self { Self { fresh_hours: 24, medium_hours: 72, old_hours: 168 } }
}

impl StalenessPolicy {
  pub fn classify(&self, last_observed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Staleness {
    let Some(last) = last_observed_at else {
      return Staleness::Unknown;
    };
    let age = now - last;
    if age < Duration::hours(i64::from(self.fresh_hours)) {
      Staleness::Fresh
    } else if age < Duration::hours(i64::from(self.medium_hours)) {
      Staleness::Medium
    } else if age < Duration::hours(i64::from(self.old_hours)) {
      Staleness::Old
    } else {
      Staleness::VeryOld
    }
  }
}

/// Read-side view of a region's freshness, computed at `as_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
  pub last_observed_at: Option<DateTime<Utc>>,
  /// Whole hours since the last observation; clamped at zero.
  pub age_hours:        Option<i64>,
  pub staleness:        Staleness,
}

impl Freshness {
  pub fn assess(
    last_observed_at: Option<DateTime<Utc>>,
    policy: &StalenessPolicy,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      last_observed_at,
      age_hours: last_observed_at.map(|t| (now - t).num_hours().max(0)),
      staleness: policy.classify(last_observed_at, now),
    }
  }
}

/// A region together with its assessed freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStatus {
  pub region:    RegionId,
  #[serde(flatten)]
  pub freshness: Freshness,
}
