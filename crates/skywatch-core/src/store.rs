//! The `ObservationStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `skywatch-store-sqlite`).
//! The ingestion operations in [`crate::ingest`] and the HTTP layer depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Retryable,
  body::{BodyKey, CelestialBody},
  coords::SystemId,
  diff::{BodyWrite, DiffEvent},
  freshness::{RegionFreshness, RegionId, RegionKind},
  observation::ObservedBody,
  report::{NewReport, Report, ReportFilter, ReportKind, ReportOutcome},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ObservationStore::get_changes`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeQuery {
  pub galaxy: Option<u16>,
  pub system: Option<u16>,
  /// Only events recorded strictly after this instant.
  pub since:  Option<DateTime<Utc>>,
  /// Only events recorded strictly before this instant.
  pub until:  Option<DateTime<Utc>>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// One entry of the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
  pub event_id:    Uuid,
  /// The scan submission that produced the event.
  pub scan_id:     Uuid,
  pub recorded_at: DateTime<Utc>,
  #[serde(flatten)]
  pub event:       DiffEvent,
}

/// Parameters for [`ObservationStore::list_freshness`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreshnessFilter {
  pub kind:   Option<RegionKind>,
  /// Restrict system regions to one galaxy. Statistics regions never match.
  pub galaxy: Option<u16>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a canonical observation store backend.
///
/// Every write is scoped to one natural key and is idempotent: replaying it
/// with the same input leaves storage exactly as a single application did.
/// Backends classify their errors through [`Retryable`] so callers can tell
/// a busy database from a broken one.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ObservationStore: Send + Sync {
  type Error: std::error::Error + Retryable + Send + Sync + 'static;

  // ── Bodies ────────────────────────────────────────────────────────────

  /// Every stored row for the system, in every status, ordered by position
  /// then kind.
  fn bodies_in_system(
    &self,
    system: SystemId,
  ) -> impl Future<Output = Result<Vec<CelestialBody>, Self::Error>> + Send + '_;

  /// Reconcile one natural key against what a scan saw there, atomically.
  ///
  /// Within a single write transaction the store reads the row at `key`,
  /// plans the write with [`diff::plan`](crate::diff::plan), applies the op
  /// per [`CelestialBody::apply`](crate::body::CelestialBody::apply) along
  /// with the owner directory upsert, and appends the planned events to the
  /// change log. The store assigns the timestamp.
  ///
  /// Returns the write that was applied, or `None` when the key needed none.
  /// Concurrent calls for the same key serialise, so the change log always
  /// replays to the stored row.
  fn reconcile_body(
    &self,
    scan_id: Uuid,
    key: BodyKey,
    observed: Option<ObservedBody>,
  ) -> impl Future<Output = Result<Option<BodyWrite>, Self::Error>> + Send + '_;

  /// Change-log entries matching `query`, oldest first.
  fn get_changes(
    &self,
    query: ChangeQuery,
  ) -> impl Future<Output = Result<Vec<ChangeRecord>, Self::Error>> + Send + '_;

  // ── Freshness ─────────────────────────────────────────────────────────

  /// Advance the region's `last_observed_at` to `observed_at` unless it
  /// already holds a later instant. Returns the row afterwards.
  fn record_observation(
    &self,
    region: RegionId,
    observed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<RegionFreshness, Self::Error>> + Send + '_;

  fn get_freshness(
    &self,
    region: RegionId,
  ) -> impl Future<Output = Result<Option<RegionFreshness>, Self::Error>> + Send + '_;

  fn list_freshness(
    &self,
    filter: FreshnessFilter,
  ) -> impl Future<Output = Result<Vec<RegionFreshness>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Insert the report or refine the stored row with the fields the delivery
  /// carries. A delivery that changes nothing writes nothing.
  fn upsert_report(
    &self,
    report: NewReport,
  ) -> impl Future<Output = Result<(Report, ReportOutcome), Self::Error>> + Send + '_;

  fn get_report(
    &self,
    kind: ReportKind,
    external_id: i64,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Reports matching `filter`, newest first.
  fn find_reports(
    &self,
    filter: ReportFilter,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + '_;
}
