//! Universe addressing: galaxies contain systems, systems contain numbered
//! positions. A position holds at most one planet and one moon.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── SystemId ────────────────────────────────────────────────────────────────

/// A solar system, the unit an observer scans in one go.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SystemId {
  pub galaxy: u16,
  pub system: u16,
}

impl SystemId {
  pub fn new(galaxy: u16, system: u16) -> Self { Self { galaxy, system } }

  /// The coordinates of `position` inside this system.
  pub fn at(self, position: u8) -> Coordinates {
    Coordinates { galaxy: self.galaxy, system: self.system, position }
  }
}

impl fmt::Display for SystemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.galaxy, self.system)
  }
}

// ─── Coordinates ─────────────────────────────────────────────────────────────

/// A single world position, written `galaxy:system:position`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coordinates {
  pub galaxy:   u16,
  pub system:   u16,
  pub position: u8,
}

impl Coordinates {
  pub fn new(galaxy: u16, system: u16, position: u8) -> Self {
    Self { galaxy, system, position }
  }

  pub fn system_id(&self) -> SystemId { SystemId::new(self.galaxy, self.system) }
}

impl fmt::Display for Coordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.galaxy, self.system, self.position)
  }
}

impl FromStr for Coordinates {
  type Err = Error;

  /// Parse `g:s:p`. Surrounding brackets (`[1:2:3]`) are tolerated because
  /// that is how the game renders coordinates.
  fn from_str(s: &str) -> Result<Self> {
    let malformed = || Error::MalformedCoordinates(s.to_owned());
    let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
    let mut parts = inner.split(':');
    let (Some(g), Some(sys), Some(p), None) =
      (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(malformed());
    };
    Ok(Self {
      galaxy:   g.trim().parse().map_err(|_| malformed())?,
      system:   sys.trim().parse().map_err(|_| malformed())?,
      position: p.trim().parse().map_err(|_| malformed())?,
    })
  }
}

// ─── Bounds ──────────────────────────────────────────────────────────────────

/// The shape of the universe. Used to validate submissions and to know how
/// many positions a complete system scan enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseBounds {
  pub galaxies:  u16,
  pub systems:   u16,
  pub positions: u8,
}

impl Default for UniverseBounds {
  fn default() -> Self { Self { galaxies: 9, systems: 499, positions: 15 } }
}

impl UniverseBounds {
  pub fn check_system(&self, id: SystemId) -> Result<()> {
    if id.galaxy == 0 || id.galaxy > self.galaxies {
      return Err(Error::GalaxyOutOfRange { galaxy: id.galaxy, max: self.galaxies });
    }
    if id.system == 0 || id.system > self.systems {
      return Err(Error::SystemOutOfRange { system: id.system, max: self.systems });
    }
    Ok(())
  }

  pub fn check_position(&self, position: u8) -> Result<()> {
    if position == 0 || position > self.positions {
      return Err(Error::PositionOutOfRange { position, max: self.positions });
    }
    Ok(())
  }

  pub fn check(&self, c: Coordinates) -> Result<()> {
    self.check_system(c.system_id())?;
    self.check_position(c.position)
  }
}
