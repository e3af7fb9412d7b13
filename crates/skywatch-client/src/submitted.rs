//! The persisted set of report keys the server has already acknowledged.
//!
//! Only an optimisation: resubmitting a report is always safe, the set just
//! saves the round trip.

use std::{collections::BTreeSet, fs, io, path::Path};

use skywatch_core::report::ReportKey;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedSet {
  keys: BTreeSet<ReportKey>,
}

impl SubmittedSet {
  /// Read the set from `path`. A missing file is an empty set.
  pub fn load(path: &Path) -> Result<Self> {
    let text = match fs::read_to_string(path) {
      Ok(text) => text,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(e) => return Err(e.into()),
    };
    let raw: Vec<String> = serde_json::from_str(&text)?;
    let keys = raw.iter().map(|k| k.parse()).collect::<Result<_, _>>()?;
    Ok(Self { keys })
  }

  /// Write the set to `path` through a sibling temp file, so an interrupted
  /// write never leaves a truncated file behind.
  pub fn save(&self, path: &Path) -> Result<()> {
    let raw: Vec<String> = self.keys.iter().map(ToString::to_string).collect();
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&raw)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
  }

  pub fn contains(&self, key: &ReportKey) -> bool { self.keys.contains(key) }

  /// Returns `false` if the key was already present.
  pub fn insert(&mut self, key: ReportKey) -> bool { self.keys.insert(key) }

  pub fn len(&self) -> usize { self.keys.len() }

  pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}
