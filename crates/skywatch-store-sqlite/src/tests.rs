//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use skywatch_core::{
  Retryable,
  body::{BodyFields, BodyKey, BodyKind, BodyOp, BodyStatus},
  coords::{Coordinates, SystemId},
  diff::DiffEvent,
  freshness::{RegionId, RegionKind, StatCategory, Staleness},
  ingest::{self, IngestSettings},
  observation::{ObservedBody, RegionScan},
  report::{
    BattlePayload, EspionagePayload, NewReport, ReportFilter, ReportKind, ReportOutcome,
    ReportPayload,
  },
  store::{ChangeQuery, FreshnessFilter, ObservationStore},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

const REGION: SystemId = SystemId { galaxy: 1, system: 42 };

fn settings() -> IngestSettings { IngestSettings::default() }

fn observed(source_id: i64, name: &str, owner: i64) -> Option<ObservedBody> {
  Some(ObservedBody {
    source_id:  Some(source_id),
    name:       Some(name.into()),
    owner_id:   Some(owner),
    owner_name: None,
  })
}

fn key(position: u8, kind: BodyKind) -> BodyKey { BodyKey::new(REGION.at(position), kind) }

async fn body_at(s: &SqliteStore, position: u8, kind: BodyKind) -> Option<skywatch_core::body::CelestialBody> {
  s.bodies_in_system(REGION)
    .await
    .unwrap()
    .into_iter()
    .find(|b| b.key() == key(position, kind))
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_is_idempotent() {
  let s = store().await;
  let seen = Some(ObservedBody {
    owner_id:   Some(7),
    owner_name: Some("Vega".into()),
    source_id:  Some(500),
    name:       Some("Home".into()),
  });

  let write = s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Planet), seen.clone()).await.unwrap();
  assert!(matches!(write.unwrap().events[..], [DiffEvent::Arrival { .. }]));
  let first = body_at(&s, 3, BodyKind::Planet).await.unwrap();
  assert_eq!(first.status, BodyStatus::New);
  assert_eq!(first.owner_name.as_deref(), Some("Vega"));

  let write = s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Planet), seen.clone()).await.unwrap();
  let write = write.unwrap();
  assert!(matches!(write.op, BodyOp::MergeFields(_)));
  assert!(write.events.is_empty());
  let second = body_at(&s, 3, BodyKind::Planet).await.unwrap();
  assert_eq!(second.status, BodyStatus::Seen);

  s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Planet), seen).await.unwrap();
  assert_eq!(body_at(&s, 3, BodyKind::Planet).await.unwrap(), second);
  assert_eq!(s.bodies_in_system(REGION).await.unwrap().len(), 1);
  assert_eq!(s.get_changes(ChangeQuery::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn merge_never_blanks_stored_fields() {
  let s = store().await;
  let full = Some(ObservedBody {
    owner_id:   Some(7),
    owner_name: Some("Vega".into()),
    source_id:  Some(500),
    name:       Some("Home".into()),
  });
  s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Planet), full).await.unwrap();

  let partial = Some(ObservedBody { source_id: Some(500), ..Default::default() });
  let write = s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Planet), partial).await.unwrap();
  assert!(matches!(
    write.unwrap().op,
    BodyOp::MergeFields(BodyFields { name: None, owner_id: None, .. })
  ));

  let body = body_at(&s, 3, BodyKind::Planet).await.unwrap();
  assert_eq!(body.name.as_deref(), Some("Home"));
  assert_eq!(body.owner_id, Some(7));
  assert_eq!(body.owner_name.as_deref(), Some("Vega"));
}

#[tokio::test]
async fn delete_is_logical_and_missing_key_is_noop() {
  let s = store().await;
  assert!(s.reconcile_body(Uuid::new_v4(), key(9, BodyKind::Moon), None).await.unwrap().is_none());
  assert!(body_at(&s, 9, BodyKind::Moon).await.is_none());

  let moon = Some(ObservedBody { source_id: Some(9), ..Default::default() });
  s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Moon), moon).await.unwrap();

  let write = s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Moon), None).await.unwrap();
  let write = write.unwrap();
  assert_eq!(write.op, BodyOp::MarkDeleted);
  assert!(matches!(write.events[..], [DiffEvent::Departure { .. }]));
  let body = body_at(&s, 3, BodyKind::Moon).await.unwrap();
  assert_eq!(body.status, BodyStatus::Deleted);
  assert_eq!(body.source_id, Some(9));

  // Already gone: nothing to write and nothing to log.
  assert!(s.reconcile_body(Uuid::new_v4(), key(3, BodyKind::Moon), None).await.unwrap().is_none());
  assert_eq!(s.get_changes(ChangeQuery::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn bodies_are_ordered_by_position_then_kind() {
  let s = store().await;
  let scan = RegionScan::new(REGION)
    .with_position(8, observed(800, "B", 1), None)
    .with_position(2, observed(200, "A", 1), observed(201, "A Moon", 1));
  ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();

  let keys: Vec<_> = s.bodies_in_system(REGION).await.unwrap().iter().map(|b| b.key()).collect();
  assert_eq!(keys, vec![
    key(2, BodyKind::Planet),
    key(2, BodyKind::Moon),
    key(8, BodyKind::Planet)
  ]);
}

// ─── Scans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_identity_at_occupied_position_replaces_it() {
  let s = store().await;
  let first = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  ingest::submit_region_scan(&s, &settings(), first).await.unwrap();

  let second = RegionScan::new(REGION).with_position(3, observed(501, "Outpost", 2), None);
  let out = ingest::submit_region_scan(&s, &settings(), second).await.unwrap();

  assert_eq!(out.events.len(), 2);
  assert!(matches!(
    &out.events[0],
    DiffEvent::Departure { body, .. } if body.source_id == Some(500) && body.owner_id == Some(1)
  ));
  assert!(matches!(
    &out.events[1],
    DiffEvent::Arrival { body, .. } if body.source_id == Some(501) && body.owner_id == Some(2)
  ));

  let row = body_at(&s, 3, BodyKind::Planet).await.unwrap();
  assert_eq!(row.source_id, Some(501));
  assert_eq!(row.owner_id, Some(2));
  assert_eq!(row.status, BodyStatus::Seen);
  assert_eq!(s.bodies_in_system(REGION).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unlisted_position_is_untouched_by_partial_scan() {
  let s = store().await;
  let full = RegionScan::new(REGION)
    .with_position(3, observed(500, "Home", 1), None)
    .with_position(7, observed(700, "Far", 1), None);
  ingest::submit_region_scan(&s, &settings(), full).await.unwrap();
  let before = body_at(&s, 7, BodyKind::Planet).await.unwrap();

  let partial = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  let out = ingest::submit_region_scan(&s, &settings(), partial).await.unwrap();

  assert!(out.events.is_empty());
  assert!(!out.warnings.is_empty());
  assert_eq!(body_at(&s, 7, BodyKind::Planet).await.unwrap(), before);
}

#[tokio::test]
async fn stable_id_with_new_name_is_a_rename() {
  let s = store().await;
  let scan = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();

  let scan = RegionScan::new(REGION).with_position(3, observed(500, "Capital", 1), None);
  let out = ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();
  assert!(matches!(&out.events[..], [DiffEvent::Rename { .. }]));
  assert_eq!(body_at(&s, 3, BodyKind::Planet).await.unwrap().name.as_deref(), Some("Capital"));
}

#[tokio::test]
async fn departure_then_reappearance() {
  let s = store().await;
  let scan = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  ingest::submit_region_scan(&s, &settings(), scan.clone()).await.unwrap();

  let empty = RegionScan::new(REGION).with_position(3, None, None);
  let out = ingest::submit_region_scan(&s, &settings(), empty.clone()).await.unwrap();
  assert!(matches!(&out.events[..], [DiffEvent::Departure { .. }]));
  assert_eq!(body_at(&s, 3, BodyKind::Planet).await.unwrap().status, BodyStatus::Deleted);

  let out = ingest::submit_region_scan(&s, &settings(), empty).await.unwrap();
  assert!(out.events.is_empty());

  let out = ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();
  assert!(matches!(&out.events[..], [DiffEvent::Arrival { .. }]));
  assert_eq!(body_at(&s, 3, BodyKind::Planet).await.unwrap().status, BodyStatus::Seen);
}

#[tokio::test]
async fn change_log_records_applied_events() {
  let s = store().await;
  let scan = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  let first = ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();
  let scan = RegionScan::new(REGION).with_position(3, observed(501, "Other", 2), None);
  let second = ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();
  let other = RegionScan::new(SystemId::new(2, 5)).with_position(1, observed(9, "X", 3), None);
  ingest::submit_region_scan(&s, &settings(), other).await.unwrap();

  let query = ChangeQuery { galaxy: Some(1), system: Some(42), ..Default::default() };
  let changes = ingest::get_changes(&s, query).await.unwrap();
  assert_eq!(changes.len(), 3);
  assert_eq!(changes[0].scan_id, first.scan_id);
  assert!(matches!(changes[0].event, DiffEvent::Arrival { .. }));
  assert!(matches!(changes[1].event, DiffEvent::Departure { .. }));
  assert!(matches!(changes[2].event, DiffEvent::Arrival { .. }));
  assert!(changes[1..].iter().all(|c| c.scan_id == second.scan_id));

  let since = ChangeQuery { since: Some(changes[2].recorded_at), ..Default::default() };
  let later = ingest::get_changes(&s, since).await.unwrap();
  assert!(later.iter().all(|c| c.event.key().coordinates.galaxy == 2));
}

#[tokio::test]
async fn change_log_window_is_half_open() {
  let s = store().await;
  let scan = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();
  let scan = RegionScan::new(REGION).with_position(3, observed(501, "Other", 2), None);
  ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();

  let all = ingest::get_changes(&s, ChangeQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let before = ChangeQuery { until: Some(all[1].recorded_at), ..Default::default() };
  let before = ingest::get_changes(&s, before).await.unwrap();
  assert_eq!(before.iter().map(|c| c.event_id).collect::<Vec<_>>(), vec![all[0].event_id]);

  let window = ChangeQuery {
    since: Some(all[0].recorded_at),
    until: Some(all[2].recorded_at + Duration::microseconds(1)),
    ..Default::default()
  };
  let window = ingest::get_changes(&s, window).await.unwrap();
  assert_eq!(window.len(), 2);
  assert!(matches!(window[0].event, DiffEvent::Departure { .. }));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

/// A fresh database path under the system temp dir, removed on drop.
struct TempDb(std::path::PathBuf);

impl TempDb {
  fn new() -> Self {
    let name = format!("skywatch-{}-{}.db", std::process::id(), Uuid::new_v4());
    Self(std::env::temp_dir().join(name))
  }
}

impl Drop for TempDb {
  fn drop(&mut self) {
    for suffix in ["", "-wal", "-shm"] {
      let mut path = self.0.clone().into_os_string();
      path.push(suffix);
      let _ = std::fs::remove_file(path);
    }
  }
}

#[tokio::test]
async fn racing_identical_scans_log_one_arrival() {
  let s = store().await;
  let scan = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  let ingest_settings = settings();
  let (a, b) = tokio::join!(
    ingest::submit_region_scan(&s, &ingest_settings, scan.clone()),
    ingest::submit_region_scan(&s, &ingest_settings, scan),
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_eq!(a.events.len() + b.events.len(), 1);

  let log = s.get_changes(ChangeQuery::default()).await.unwrap();
  assert_eq!(log.len(), 1);
  assert!(matches!(log[0].event, DiffEvent::Arrival { .. }));
}

#[tokio::test]
async fn racing_replacements_from_two_handles_replay_to_the_row() {
  let db = TempDb::new();
  let one = SqliteStore::open(&db.0).await.unwrap();
  let two = SqliteStore::open(&db.0).await.unwrap();

  let left = RegionScan::new(REGION).with_position(5, observed(600, "Left", 1), None);
  let right = RegionScan::new(REGION).with_position(5, observed(601, "Right", 2), None);
  let ingest_settings = settings();
  let (a, b) = tokio::join!(
    ingest::submit_region_scan(&one, &ingest_settings, left),
    ingest::submit_region_scan(&two, &ingest_settings, right),
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert!(a.is_complete() && b.is_complete());

  // One arrival, then the departure of that identity and the other's arrival.
  let log = one.get_changes(ChangeQuery::default()).await.unwrap();
  assert_eq!(log.len(), 3);
  let DiffEvent::Arrival { body: first, .. } = &log[0].event else {
    panic!("expected arrival, got {:?}", log[0].event)
  };
  let DiffEvent::Departure { body: gone, .. } = &log[1].event else {
    panic!("expected departure, got {:?}", log[1].event)
  };
  let DiffEvent::Arrival { body: last, .. } = &log[2].event else {
    panic!("expected arrival, got {:?}", log[2].event)
  };
  assert_eq!(gone.source_id, first.source_id);
  assert_ne!(last.source_id, first.source_id);

  let row = body_at(&two, 5, BodyKind::Planet).await.unwrap();
  assert_eq!(row.source_id, last.source_id);
}

#[tokio::test]
async fn reads_are_not_queued_behind_a_waiting_write() {
  let db = TempDb::new();
  let s = SqliteStore::open(&db.0).await.unwrap();
  let region = RegionId::System(REGION);
  let earlier = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
  s.record_observation(region, earlier).await.unwrap();

  // Another process holds the write lock until released.
  let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();
  let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
  let other = tokio_rusqlite::Connection::open(&db.0).await.unwrap();
  let holder = tokio::spawn(async move {
    other
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let _ = locked_tx.send(());
        let _ = release_rx.recv();
        tx.commit()?;
        Ok(())
      })
      .await
  });
  locked_rx.await.unwrap();

  // This write now sits in the busy handler on the store's writer.
  let writer = s.clone();
  let later = earlier + Duration::hours(1);
  let pending = tokio::spawn(async move { writer.record_observation(region, later).await });
  tokio::time::sleep(std::time::Duration::from_millis(50)).await;

  let read = tokio::time::timeout(std::time::Duration::from_secs(2), s.get_freshness(region))
    .await
    .expect("read finished while a write was waiting for the lock");
  assert_eq!(read.unwrap().unwrap().last_observed_at, earlier);

  release_tx.send(()).unwrap();
  holder.await.unwrap().unwrap();
  let row = pending.await.unwrap().unwrap();
  assert_eq!(row.last_observed_at, later);
}

// ─── Freshness ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn freshness_is_monotonic() {
  let s = store().await;
  let region = RegionId::System(REGION);
  let t = |h: i64| Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::hours(h);

  let row = s.record_observation(region, t(10)).await.unwrap();
  assert_eq!(row.last_observed_at, t(10));
  let row = s.record_observation(region, t(2)).await.unwrap();
  assert_eq!(row.last_observed_at, t(10));
  let row = s.record_observation(region, t(12)).await.unwrap();
  assert_eq!(row.last_observed_at, t(12));

  let stored = s.get_freshness(region).await.unwrap().unwrap();
  assert_eq!(stored.last_observed_at, t(12));
}

#[tokio::test]
async fn unchanged_scan_still_refreshes_region() {
  let s = store().await;
  let mut scan = RegionScan::new(REGION).with_position(3, observed(500, "Home", 1), None);
  scan.observed_at = Some(Utc::now() - Duration::hours(100));
  ingest::submit_region_scan(&s, &settings(), scan.clone()).await.unwrap();

  let state = ingest::get_region_state(&s, &settings(), REGION, false).await.unwrap();
  assert_eq!(state.freshness.staleness, Staleness::Old);

  scan.observed_at = None;
  let out = ingest::submit_region_scan(&s, &settings(), scan).await.unwrap();
  assert!(out.events.is_empty());

  let state = ingest::get_region_state(&s, &settings(), REGION, false).await.unwrap();
  assert_eq!(state.freshness.staleness, Staleness::Fresh);
  assert_eq!(state.bodies.len(), 1);
}

#[tokio::test]
async fn freshness_listing_filters_by_kind_and_galaxy() {
  let s = store().await;
  let now = Utc::now();
  s.record_observation(RegionId::System(SystemId::new(1, 1)), now).await.unwrap();
  s.record_observation(RegionId::System(SystemId::new(2, 1)), now).await.unwrap();
  ingest::mark_observed(&s, &settings(), RegionId::Statistics(StatCategory::Honor), None)
    .await
    .unwrap();

  let all = ingest::list_freshness(&s, &settings(), FreshnessFilter::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let stats = FreshnessFilter { kind: Some(RegionKind::Statistics), galaxy: None };
  let stats = ingest::list_freshness(&s, &settings(), stats).await.unwrap();
  assert_eq!(stats.len(), 1);
  assert_eq!(stats[0].region, RegionId::Statistics(StatCategory::Honor));

  let g2 = FreshnessFilter { kind: None, galaxy: Some(2) };
  let g2 = ingest::list_freshness(&s, &settings(), g2).await.unwrap();
  assert_eq!(g2.len(), 1);
  assert_eq!(g2[0].region, RegionId::System(SystemId::new(2, 1)));
}

// ─── Reports ─────────────────────────────────────────────────────────────────

fn battle(metal: Option<i64>, crystal: Option<i64>) -> NewReport {
  NewReport::new(42, ReportPayload::Battle(BattlePayload { metal, crystal, ..Default::default() }))
}

#[tokio::test]
async fn redelivery_updates_the_single_row() {
  let s = store().await;
  let ack = ingest::submit_report(&s, &settings(), battle(Some(100), None)).await.unwrap();
  assert_eq!(ack.outcome, ReportOutcome::Inserted);
  assert_eq!(ack.revision, 1);

  let ack = ingest::submit_report(&s, &settings(), battle(Some(150), None)).await.unwrap();
  assert_eq!(ack.outcome, ReportOutcome::Updated);
  assert_eq!(ack.revision, 2);

  let all = s.find_reports(ReportFilter::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(matches!(
    all[0].payload,
    ReportPayload::Battle(BattlePayload { metal: Some(150), .. })
  ));
}

#[tokio::test]
async fn identical_redelivery_is_bit_identical() {
  let s = store().await;
  let mut report = battle(Some(100), Some(20));
  report.target = Some(Coordinates::new(1, 42, 3));
  report.reported_by = Some(17);

  ingest::submit_report(&s, &settings(), report.clone()).await.unwrap();
  let once = s.get_report(ReportKind::Battle, 42).await.unwrap().unwrap();

  let ack = ingest::submit_report(&s, &settings(), report).await.unwrap();
  assert_eq!(ack.outcome, ReportOutcome::Unchanged);
  let twice = s.get_report(ReportKind::Battle, 42).await.unwrap().unwrap();
  assert_eq!(once, twice);
}

#[tokio::test]
async fn partial_redelivery_keeps_earlier_fields() {
  let s = store().await;
  let mut first = battle(Some(100), Some(20));
  first.target = Some(Coordinates::new(1, 42, 3));
  ingest::submit_report(&s, &settings(), first).await.unwrap();

  ingest::submit_report(&s, &settings(), battle(None, Some(25))).await.unwrap();

  let stored = s.get_report(ReportKind::Battle, 42).await.unwrap().unwrap();
  assert_eq!(stored.target, Some(Coordinates::new(1, 42, 3)));
  assert!(matches!(
    stored.payload,
    ReportPayload::Battle(BattlePayload { metal: Some(100), crystal: Some(25), .. })
  ));
}

#[tokio::test]
async fn nested_payload_maps_merge() {
  let s = store().await;
  let spy = |fleet: &[(&str, i64)]| {
    NewReport::new(
      7,
      ReportPayload::Espionage(EspionagePayload {
        fleet: Some(fleet.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
        ..Default::default()
      }),
    )
  };
  ingest::submit_report(&s, &settings(), spy(&[("cruiser", 4)])).await.unwrap();
  ingest::submit_report(&s, &settings(), spy(&[("bomber", 2)])).await.unwrap();

  let stored = s.get_report(ReportKind::Espionage, 7).await.unwrap().unwrap();
  let ReportPayload::Espionage(p) = stored.payload else { panic!("wrong kind") };
  let fleet = p.fleet.unwrap();
  assert_eq!(fleet["cruiser"], 4);
  assert_eq!(fleet["bomber"], 2);
}

#[tokio::test]
async fn same_external_id_in_different_kinds_are_distinct() {
  let s = store().await;
  ingest::submit_report(&s, &settings(), battle(Some(1), None)).await.unwrap();
  let spy = NewReport::new(42, ReportPayload::Espionage(EspionagePayload::default()));
  ingest::submit_report(&s, &settings(), spy).await.unwrap();

  assert_eq!(s.find_reports(ReportFilter::default()).await.unwrap().len(), 2);
  let only_battles = ReportFilter { kind: Some(ReportKind::Battle), ..Default::default() };
  assert_eq!(s.find_reports(only_battles).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_deliveries_leave_one_row() {
  let s = store().await;
  let ingest_settings = settings();
  let (a, b) = tokio::join!(
    ingest::submit_report(&s, &ingest_settings, battle(Some(100), None)),
    ingest::submit_report(&s, &ingest_settings, battle(Some(100), None)),
  );
  let outcomes = [a.unwrap().outcome, b.unwrap().outcome];
  assert!(outcomes.contains(&ReportOutcome::Inserted));
  assert!(outcomes.contains(&ReportOutcome::Unchanged));
  assert_eq!(s.find_reports(ReportFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn report_filters() {
  let s = store().await;
  let t = |h: i64| Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::hours(h);
  for (id, position, hour) in [(1, 3, 0), (2, 3, 5), (3, 9, 10)] {
    let mut r = NewReport::new(id, ReportPayload::Battle(BattlePayload::default()));
    r.target = Some(Coordinates::new(1, 42, position));
    r.report_time = Some(t(hour));
    r.reported_by = Some(if id == 3 { 99 } else { 11 });
    ingest::submit_report(&s, &settings(), r).await.unwrap();
  }

  let at_3 = ReportFilter { position: Some(3), ..Default::default() };
  let found = s.find_reports(at_3).await.unwrap();
  assert_eq!(found.iter().map(|r| r.external_id).collect::<Vec<_>>(), vec![2, 1]);

  let window = ReportFilter { since: Some(t(5)), until: Some(t(10)), ..Default::default() };
  let found = s.find_reports(window).await.unwrap();
  assert_eq!(found.iter().map(|r| r.external_id).collect::<Vec<_>>(), vec![2]);

  let by = ReportFilter { reported_by: Some(99), ..Default::default() };
  assert_eq!(s.find_reports(by).await.unwrap()[0].external_id, 3);

  let page = ReportFilter { limit: Some(1), offset: Some(1), ..Default::default() };
  assert_eq!(s.find_reports(page).await.unwrap()[0].external_id, 2);
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn busy_database_is_retryable() {
  let busy = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY), None);
  assert!(Error::Database(tokio_rusqlite::Error::Rusqlite(busy)).is_retryable());
  assert!(Error::Database(tokio_rusqlite::Error::ConnectionClosed).is_retryable());

  let constraint = rusqlite::Error::SqliteFailure(
    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
    None,
  );
  assert!(!Error::Database(tokio_rusqlite::Error::Rusqlite(constraint)).is_retryable());
  assert!(!Error::DateParse("x".into()).is_retryable());
}
