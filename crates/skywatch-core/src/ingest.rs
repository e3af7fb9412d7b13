//! Ingestion and query operations over any [`ObservationStore`].
//!
//! These are the operations the HTTP layer exposes. Each one validates its
//! input completely before touching storage, then issues one short write per
//! natural key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Retryable,
  body::{BodyKind, CelestialBody},
  coords::{Coordinates, SystemId, UniverseBounds},
  diff::{self, DiffEvent},
  freshness::{Freshness, RegionFreshness, RegionId, RegionStatus, StalenessPolicy},
  observation::RegionScan,
  report::{Ack, NewReport, Report, ReportFilter, ReportKind},
  store::{ChangeQuery, ChangeRecord, FreshnessFilter, ObservationStore},
};

/// Page size applied when a query does not name one.
pub const DEFAULT_LIMIT: usize = 100;
/// Upper bound on any page size.
pub const MAX_LIMIT: usize = 1000;

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
  pub universe:  UniverseBounds,
  pub staleness: StalenessPolicy,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Failure of a whole operation. Per-key write failures during a scan are
/// not errors; they are reported in [`ScanOutcome::failures`].
#[derive(Debug, Error)]
pub enum IngestError<E> {
  /// The input was rejected; nothing was written.
  #[error(transparent)]
  Invalid(#[from] Error),

  /// Transient storage failure; the operation can be retried as-is.
  #[error("storage unavailable: {0}")]
  Unavailable(#[source] E),

  #[error("storage error: {0}")]
  Storage(#[source] E),
}

impl<E: Retryable> IngestError<E> {
  fn store(err: E) -> Self {
    if err.is_retryable() { Self::Unavailable(err) } else { Self::Storage(err) }
  }
}

impl<E> Retryable for IngestError<E> {
  fn is_retryable(&self) -> bool { matches!(self, Self::Unavailable(_)) }
}

pub type IngestResult<T, E> = std::result::Result<T, IngestError<E>>;

// ─── Scan submission ─────────────────────────────────────────────────────────

/// Non-fatal observations about an accepted scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ScanWarning {
  /// Fewer positions were enumerated than the system holds. Missing
  /// positions were treated as not observed.
  PartialSnapshot { enumerated: usize, capacity: u8 },
}

/// A natural key whose write did not land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFailure {
  pub coordinates: Coordinates,
  pub kind:        BodyKind,
  pub error:       String,
  pub retryable:   bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
  pub scan_id:   Uuid,
  pub region:    SystemId,
  /// Events for keys whose writes were applied, in position order.
  pub events:    Vec<DiffEvent>,
  pub warnings:  Vec<ScanWarning>,
  pub failures:  Vec<KeyFailure>,
  /// The region's freshness after the scan; absent when any key failed.
  pub freshness: Option<RegionFreshness>,
}

impl ScanOutcome {
  pub fn is_complete(&self) -> bool { self.failures.is_empty() }
}

/// Reconcile one system snapshot into the canonical store.
///
/// The scan is validated as a whole first. Every enumerated key is then
/// reconciled on its own against the row the store holds at that moment: a
/// failure aborts that key only, and its events are dropped.
/// Freshness advances only when every key landed, even if nothing changed.
pub async fn submit_region_scan<S: ObservationStore>(
  store: &S,
  settings: &IngestSettings,
  scan: RegionScan,
) -> IngestResult<ScanOutcome, S::Error> {
  scan.validate(&settings.universe)?;

  let now = Utc::now();
  let observed_at = clamp_to_now(scan.observed_at, now);
  let scan_id = Uuid::new_v4();
  let region = scan.region;

  let mut warnings = Vec::new();
  if scan.is_partial(&settings.universe) {
    warn!(
      %region,
      enumerated = scan.positions.len(),
      capacity = settings.universe.positions,
      "partial snapshot"
    );
    warnings.push(ScanWarning::PartialSnapshot {
      enumerated: scan.positions.len(),
      capacity:   settings.universe.positions,
    });
  }

  let mut events = Vec::new();
  let mut failures = Vec::new();
  for (key, observed) in diff::scanned_keys(&scan) {
    match store.reconcile_body(scan_id, key, observed.cloned()).await {
      Ok(Some(write)) => {
        debug!(%key, %scan_id, events = write.events.len(), "key reconciled");
        events.extend(write.events);
      }
      Ok(None) => {}
      Err(err) => {
        warn!(%key, error = %err, "body write failed");
        failures.push(KeyFailure {
          coordinates: key.coordinates,
          kind:        key.kind,
          retryable:   err.is_retryable(),
          error:       err.to_string(),
        });
      }
    }
  }

  let freshness = if failures.is_empty() {
    let row = store
      .record_observation(RegionId::System(region), observed_at)
      .await
      .map_err(IngestError::store)?;
    Some(row)
  } else {
    None
  };

  info!(
    %region,
    %scan_id,
    events = events.len(),
    failures = failures.len(),
    "scan accepted"
  );

  Ok(ScanOutcome { scan_id, region, events, warnings, failures, freshness })
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Idempotently ingest one report delivery.
pub async fn submit_report<S: ObservationStore>(
  store: &S,
  settings: &IngestSettings,
  report: NewReport,
) -> IngestResult<Ack, S::Error> {
  report.validate(&settings.universe)?;

  let key = report.key();
  let (stored, outcome) = store.upsert_report(report).await.map_err(IngestError::store)?;
  info!(report = %key, ?outcome, revision = stored.revision, "report accepted");

  Ok(Ack {
    kind: stored.kind,
    external_id: stored.external_id,
    outcome,
    revision: stored.revision,
  })
}

pub async fn get_reports<S: ObservationStore>(
  store: &S,
  mut filter: ReportFilter,
) -> IngestResult<Vec<Report>, S::Error> {
  filter.limit = Some(page_size(filter.limit));
  store.find_reports(filter).await.map_err(IngestError::store)
}

pub async fn get_report<S: ObservationStore>(
  store: &S,
  kind: ReportKind,
  external_id: i64,
) -> IngestResult<Option<Report>, S::Error> {
  store.get_report(kind, external_id).await.map_err(IngestError::store)
}

// ─── Region reads ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionState {
  pub region:    SystemId,
  pub bodies:    Vec<CelestialBody>,
  pub freshness: Freshness,
}

/// Current canonical bodies of a system plus its freshness. Deleted rows are
/// hidden unless `include_deleted` is set.
pub async fn get_region_state<S: ObservationStore>(
  store: &S,
  settings: &IngestSettings,
  region: SystemId,
  include_deleted: bool,
) -> IngestResult<RegionState, S::Error> {
  settings.universe.check_system(region)?;

  let mut bodies = store.bodies_in_system(region).await.map_err(IngestError::store)?;
  if !include_deleted {
    bodies.retain(|b| b.status.is_live());
  }
  let last = store
    .get_freshness(RegionId::System(region))
    .await
    .map_err(IngestError::store)?
    .map(|f| f.last_observed_at);

  Ok(RegionState {
    region,
    bodies,
    freshness: Freshness::assess(last, &settings.staleness, Utc::now()),
  })
}

pub async fn get_changes<S: ObservationStore>(
  store: &S,
  mut query: ChangeQuery,
) -> IngestResult<Vec<ChangeRecord>, S::Error> {
  query.limit = Some(page_size(query.limit));
  store.get_changes(query).await.map_err(IngestError::store)
}

// ─── Freshness ───────────────────────────────────────────────────────────────

pub async fn list_freshness<S: ObservationStore>(
  store: &S,
  settings: &IngestSettings,
  filter: FreshnessFilter,
) -> IngestResult<Vec<RegionStatus>, S::Error> {
  let now = Utc::now();
  let rows = store.list_freshness(filter).await.map_err(IngestError::store)?;
  Ok(rows.into_iter().map(|row| status(row, &settings.staleness, now)).collect())
}

/// Record an observation of a region made outside a scan, e.g. a statistics
/// sync.
pub async fn mark_observed<S: ObservationStore>(
  store: &S,
  settings: &IngestSettings,
  region: RegionId,
  observed_at: Option<DateTime<Utc>>,
) -> IngestResult<RegionStatus, S::Error> {
  if let Some(system) = region.system() {
    settings.universe.check_system(system)?;
  }
  let now = Utc::now();
  let row = store
    .record_observation(region, clamp_to_now(observed_at, now))
    .await
    .map_err(IngestError::store)?;
  info!(%region, "region marked observed");
  Ok(status(row, &settings.staleness, now))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn status(row: RegionFreshness, policy: &StalenessPolicy, now: DateTime<Utc>) -> RegionStatus {
  RegionStatus {
    region:    row.region,
    freshness: Freshness::assess(Some(row.last_observed_at), policy, now),
  }
}

fn clamp_to_now(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
  at.map_or(now, |t| t.min(now))
}

fn page_size(requested: Option<usize>) -> usize {
  requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
