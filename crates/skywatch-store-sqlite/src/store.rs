//! [`SqliteStore`]: the SQLite implementation of [`ObservationStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{OpenFlags, OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use skywatch_core::{
  body::{BodyFields, BodyKey, BodyOp, CelestialBody},
  coords::SystemId,
  diff::{self, BodyWrite},
  freshness::{RegionFreshness, RegionId},
  observation::ObservedBody,
  report::{NewReport, Report, ReportFilter, ReportKind, ReportOutcome},
  store::{ChangeQuery, ChangeRecord, FreshnessFilter, ObservationStore},
};

use crate::{
  Error, Result,
  encode::{RawBody, RawChange, RawFreshness, RawReport, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// How long a writer waits on a locked database before giving up with a
/// retryable error.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Skywatch observation store backed by a single SQLite file.
///
/// File-backed stores hold two connections: every write goes through the
/// writer, and reads go through a separate read-only connection so they are
/// served from the WAL instead of queueing behind a write. In-memory stores
/// cannot be shared between connections and use the writer for both.
///
/// Cloning is cheap; the inner connections are reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  writer: tokio_rusqlite::Connection,
  reader: Option<tokio_rusqlite::Connection>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let writer = tokio_rusqlite::Connection::open(path).await?;
    init_schema(&writer).await?;

    let reader = tokio_rusqlite::Connection::open_with_flags(
      path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .await?;
    reader
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(())
      })
      .await?;

    debug!(path = %path.display(), "opened store");
    Ok(Self { writer, reader: Some(reader) })
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let writer = tokio_rusqlite::Connection::open_in_memory().await?;
    init_schema(&writer).await?;
    Ok(Self { writer, reader: None })
  }

  fn reader(&self) -> &tokio_rusqlite::Connection { self.reader.as_ref().unwrap_or(&self.writer) }
}

async fn init_schema(conn: &tokio_rusqlite::Connection) -> Result<()> {
  conn
    .call(|conn| {
      conn.busy_timeout(BUSY_TIMEOUT)?;
      conn.execute_batch(SCHEMA)?;
      Ok(())
    })
    .await?;
  Ok(())
}

// ─── Statements ──────────────────────────────────────────────────────────────

/// Owner directory upsert. The name is only overwritten when supplied.
const UPSERT_OWNER: &str = "
  INSERT INTO owners (owner_id, name, updated_at) VALUES (?1, ?2, ?3)
  ON CONFLICT (owner_id) DO UPDATE SET
    name       = excluded.name,
    updated_at = MAX(owners.updated_at, excluded.updated_at)
  WHERE excluded.name IS NOT NULL AND excluded.name IS NOT owners.name";

/// `BodyOp::MergeFields`: supplied fields overwrite, absent ones are kept.
/// The `WHERE` clause turns an identical resubmission into a no-op so
/// `updated_at` only moves when something changed.
const MERGE_BODY: &str = "
  INSERT INTO bodies (
    galaxy, system, position, kind, owner_id, source_id, name,
    status, created_at, updated_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'new', ?8, ?8)
  ON CONFLICT (galaxy, system, position, kind) DO UPDATE SET
    owner_id   = COALESCE(excluded.owner_id, bodies.owner_id),
    source_id  = COALESCE(excluded.source_id, bodies.source_id),
    name       = COALESCE(excluded.name, bodies.name),
    status     = 'seen',
    updated_at = MAX(bodies.updated_at, excluded.updated_at)
  WHERE bodies.status != 'seen'
     OR COALESCE(excluded.owner_id, bodies.owner_id)   IS NOT bodies.owner_id
     OR COALESCE(excluded.source_id, bodies.source_id) IS NOT bodies.source_id
     OR COALESCE(excluded.name, bodies.name)           IS NOT bodies.name";

/// `BodyOp::Insert`: a new identity replaces every identity field.
const INSERT_BODY: &str = "
  INSERT INTO bodies (
    galaxy, system, position, kind, owner_id, source_id, name,
    status, created_at, updated_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'new', ?8, ?8)
  ON CONFLICT (galaxy, system, position, kind) DO UPDATE SET
    owner_id   = excluded.owner_id,
    source_id  = excluded.source_id,
    name       = excluded.name,
    status     = 'seen',
    updated_at = MAX(bodies.updated_at, excluded.updated_at)
  WHERE bodies.status != 'seen'
     OR excluded.owner_id  IS NOT bodies.owner_id
     OR excluded.source_id IS NOT bodies.source_id
     OR excluded.name      IS NOT bodies.name";

/// `BodyOp::MarkDeleted`: logical deletion, fields kept.
const DELETE_BODY: &str = "
  UPDATE bodies
     SET status = 'deleted', updated_at = MAX(updated_at, ?5)
   WHERE galaxy = ?1 AND system = ?2 AND position = ?3 AND kind = ?4
     AND status != 'deleted'";

const INSERT_EVENT: &str = "
  INSERT INTO body_events (
    event_id, scan_id, galaxy, system, position, kind,
    event_type, event_json, recorded_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

/// Report upsert. Top-level columns coalesce, the payload is merged with
/// `json_patch` (payloads never contain nulls, so nothing is ever removed).
/// Returns no row when the delivery changed nothing.
const UPSERT_REPORT: &str = "
  INSERT INTO reports (
    kind, external_id, galaxy, system, position, body_kind,
    reported_by, report_time, payload, revision, created_at, updated_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, json(?9), 1, ?10, ?10)
  ON CONFLICT (kind, external_id) DO UPDATE SET
    galaxy      = COALESCE(excluded.galaxy, reports.galaxy),
    system      = COALESCE(excluded.system, reports.system),
    position    = COALESCE(excluded.position, reports.position),
    body_kind   = COALESCE(excluded.body_kind, reports.body_kind),
    reported_by = COALESCE(excluded.reported_by, reports.reported_by),
    report_time = COALESCE(excluded.report_time, reports.report_time),
    payload     = json_patch(reports.payload, excluded.payload),
    revision    = reports.revision + 1,
    updated_at  = MAX(reports.updated_at, excluded.updated_at)
  WHERE COALESCE(excluded.galaxy, reports.galaxy)           IS NOT reports.galaxy
     OR COALESCE(excluded.system, reports.system)           IS NOT reports.system
     OR COALESCE(excluded.position, reports.position)       IS NOT reports.position
     OR COALESCE(excluded.body_kind, reports.body_kind)     IS NOT reports.body_kind
     OR COALESCE(excluded.reported_by, reports.reported_by) IS NOT reports.reported_by
     OR COALESCE(excluded.report_time, reports.report_time) IS NOT reports.report_time
     OR json_patch(reports.payload, excluded.payload)       IS NOT reports.payload
  RETURNING revision";

// ─── Body helpers ────────────────────────────────────────────────────────────

/// Carry a crate error out of a connection closure; unwrapped again by
/// `From<tokio_rusqlite::Error> for Error`.
fn carry(err: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err.into()))
}

/// The row at `key` in any status, joined with its owner's name.
fn body_at(
  conn: &rusqlite::Connection,
  key: BodyKey,
) -> tokio_rusqlite::Result<Option<CelestialBody>> {
  let c = key.coordinates;
  let sql = format!(
    "SELECT {}
     FROM bodies b
     LEFT JOIN owners o ON o.owner_id = b.owner_id
     WHERE b.galaxy = ?1 AND b.system = ?2 AND b.position = ?3 AND b.kind = ?4",
    RawBody::COLUMNS
  );
  let raw = conn
    .query_row(
      &sql,
      rusqlite::params![c.galaxy, c.system, c.position, key.kind.as_str()],
      RawBody::from_row,
    )
    .optional()?;
  raw.map(RawBody::into_body).transpose().map_err(carry)
}

/// Apply `write` and append its events. Must run inside the transaction the
/// write was planned in.
fn apply_write(
  conn: &rusqlite::Connection,
  scan_id: &str,
  at: &str,
  write: &BodyWrite,
) -> tokio_rusqlite::Result<()> {
  let c = write.key.coordinates;
  let kind = write.key.kind.as_str();

  let upsert = |sql: &str, fields: &BodyFields| -> rusqlite::Result<()> {
    if let Some(owner_id) = fields.owner_id {
      conn.execute(UPSERT_OWNER, rusqlite::params![owner_id, fields.owner_name, at])?;
    }
    conn.execute(
      sql,
      rusqlite::params![
        c.galaxy,
        c.system,
        c.position,
        kind,
        fields.owner_id,
        fields.source_id,
        fields.name,
        at,
      ],
    )?;
    Ok(())
  };

  match &write.op {
    BodyOp::MergeFields(fields) => upsert(MERGE_BODY, fields)?,
    BodyOp::Insert(fields) => upsert(INSERT_BODY, fields)?,
    BodyOp::MarkDeleted => {
      conn.execute(DELETE_BODY, rusqlite::params![c.galaxy, c.system, c.position, kind, at])?;
    }
  }

  for event in &write.events {
    let json = serde_json::to_string(event).map_err(carry)?;
    conn.execute(
      INSERT_EVENT,
      rusqlite::params![
        encode_uuid(Uuid::new_v4()),
        scan_id,
        c.galaxy,
        c.system,
        c.position,
        kind,
        event.discriminant(),
        json,
        at,
      ],
    )?;
  }
  Ok(())
}

// ─── ObservationStore impl ───────────────────────────────────────────────────

impl ObservationStore for SqliteStore {
  type Error = Error;

  // ── Bodies ────────────────────────────────────────────────────────────────

  async fn bodies_in_system(&self, system: SystemId) -> Result<Vec<CelestialBody>> {
    let raws: Vec<RawBody> = self
      .reader()
      .call(move |conn| {
        let sql = format!(
          "SELECT {}
           FROM bodies b
           LEFT JOIN owners o ON o.owner_id = b.owner_id
           WHERE b.galaxy = ?1 AND b.system = ?2
           ORDER BY b.position, CASE b.kind WHEN 'planet' THEN 0 ELSE 1 END",
          RawBody::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![system.galaxy, system.system], RawBody::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBody::into_body).collect()
  }

  async fn reconcile_body(
    &self,
    scan_id: Uuid,
    key: BodyKey,
    observed: Option<ObservedBody>,
  ) -> Result<Option<BodyWrite>> {
    let scan_str = encode_uuid(scan_id);

    let applied = self
      .writer
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Stamped under the write lock so log order matches commit order.
        let at_str = encode_dt(Utc::now());
        let existing = body_at(&tx, key)?;
        let Some(write) = diff::plan(key, observed.as_ref(), existing.as_ref()) else {
          return Ok(None);
        };
        apply_write(&tx, &scan_str, &at_str, &write)?;
        tx.commit()?;
        Ok(Some(write))
      })
      .await?;

    if let Some(write) = &applied {
      debug!(%key, %scan_id, events = write.events.len(), "body write applied");
    }
    Ok(applied)
  }

  async fn get_changes(&self, query: ChangeQuery) -> Result<Vec<ChangeRecord>> {
    let since_str = query.since.map(encode_dt);
    let until_str = query.until.map(encode_dt);
    let limit_val = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawChange> = self
      .reader()
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, scan_id, recorded_at, event_json
           FROM body_events
           WHERE (?1 IS NULL OR galaxy = ?1)
             AND (?2 IS NULL OR system = ?2)
             AND (?3 IS NULL OR recorded_at > ?3)
             AND (?4 IS NULL OR recorded_at < ?4)
           ORDER BY recorded_at, rowid
           LIMIT ?5 OFFSET ?6",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              query.galaxy,
              query.system,
              since_str,
              until_str,
              limit_val,
              offset_val
            ],
            |row| {
              Ok(RawChange {
                event_id:    row.get(0)?,
                scan_id:     row.get(1)?,
                recorded_at: row.get(2)?,
                event_json:  row.get(3)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChange::into_change).collect()
  }

  // ── Freshness ─────────────────────────────────────────────────────────────

  async fn record_observation(
    &self,
    region: RegionId,
    observed_at: DateTime<Utc>,
  ) -> Result<RegionFreshness> {
    let region_str = region.to_string();
    let kind_str = region.kind().as_str();
    let system = region.system();
    let at_str = encode_dt(observed_at);

    debug!(%region, observed_at = %at_str, "recording observation");

    let last: String = self
      .writer
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO region_freshness (region, region_kind, galaxy, system, last_observed_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (region) DO UPDATE SET
             last_observed_at = MAX(region_freshness.last_observed_at, excluded.last_observed_at)
           RETURNING last_observed_at",
          rusqlite::params![
            region_str,
            kind_str,
            system.map(|s| s.galaxy),
            system.map(|s| s.system),
            at_str,
          ],
          |row| row.get(0),
        )?)
      })
      .await?;

    RawFreshness { region: region.to_string(), last_observed_at: last }.into_freshness()
  }

  async fn get_freshness(&self, region: RegionId) -> Result<Option<RegionFreshness>> {
    let region_str = region.to_string();

    let raw: Option<RawFreshness> = self
      .reader()
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT region, last_observed_at FROM region_freshness WHERE region = ?1",
              rusqlite::params![region_str],
              |row| Ok(RawFreshness { region: row.get(0)?, last_observed_at: row.get(1)? }),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFreshness::into_freshness).transpose()
  }

  async fn list_freshness(&self, filter: FreshnessFilter) -> Result<Vec<RegionFreshness>> {
    let kind_str = filter.kind.map(|k| k.as_str());

    let raws: Vec<RawFreshness> = self
      .reader()
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT region, last_observed_at
           FROM region_freshness
           WHERE (?1 IS NULL OR region_kind = ?1)
             AND (?2 IS NULL OR galaxy = ?2)
           ORDER BY region_kind DESC, galaxy, system, region",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str, filter.galaxy], |row| {
            Ok(RawFreshness { region: row.get(0)?, last_observed_at: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFreshness::into_freshness).collect()
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn upsert_report(&self, report: NewReport) -> Result<(Report, ReportOutcome)> {
    let kind_str = report.kind().as_str();
    let external_id = report.external_id;
    let target = report.target;
    let body_kind_str = report.body_kind.map(|k| k.as_str());
    let reported_by = report.reported_by;
    let report_time_str = report.report_time.map(encode_dt);
    let payload_str = report.payload.to_json()?.to_string();
    let at_str = encode_dt(Utc::now());

    debug!(kind = kind_str, external_id, "upserting report");

    let (revision, raw): (Option<u32>, RawReport) = self
      .writer
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let revision: Option<u32> = tx
          .query_row(
            UPSERT_REPORT,
            rusqlite::params![
              kind_str,
              external_id,
              target.map(|t| t.galaxy),
              target.map(|t| t.system),
              target.map(|t| t.position),
              body_kind_str,
              reported_by,
              report_time_str,
              payload_str,
              at_str,
            ],
            |row| row.get(0),
          )
          .optional()?;

        let sql = format!(
          "SELECT {} FROM reports WHERE kind = ?1 AND external_id = ?2",
          RawReport::COLUMNS
        );
        let raw =
          tx.query_row(&sql, rusqlite::params![kind_str, external_id], RawReport::from_row)?;

        tx.commit()?;
        Ok((revision, raw))
      })
      .await?;

    let outcome = match revision {
      None => ReportOutcome::Unchanged,
      Some(1) => ReportOutcome::Inserted,
      Some(_) => ReportOutcome::Updated,
    };
    Ok((raw.into_report()?, outcome))
  }

  async fn get_report(&self, kind: ReportKind, external_id: i64) -> Result<Option<Report>> {
    let kind_str = kind.as_str();

    let raw: Option<RawReport> = self
      .reader()
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM reports WHERE kind = ?1 AND external_id = ?2",
          RawReport::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![kind_str, external_id], RawReport::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn find_reports(&self, filter: ReportFilter) -> Result<Vec<Report>> {
    let kind_str = filter.kind.map(|k| k.as_str());
    let since_str = filter.since.map(encode_dt);
    let until_str = filter.until.map(encode_dt);
    let limit_val = filter.limit.map_or(-1, |l| l as i64);
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawReport> = self
      .reader()
      .call(move |conn| {
        let sql = format!(
          "SELECT {}
           FROM reports
           WHERE (?1 IS NULL OR kind = ?1)
             AND (?2 IS NULL OR galaxy = ?2)
             AND (?3 IS NULL OR system = ?3)
             AND (?4 IS NULL OR position = ?4)
             AND (?5 IS NULL OR reported_by = ?5)
             AND (?6 IS NULL OR COALESCE(report_time, created_at) >= ?6)
             AND (?7 IS NULL OR COALESCE(report_time, created_at) < ?7)
           ORDER BY COALESCE(report_time, created_at) DESC, kind, external_id DESC
           LIMIT ?8 OFFSET ?9",
          RawReport::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              kind_str,
              filter.galaxy,
              filter.system,
              filter.position,
              filter.reported_by,
              since_str,
              until_str,
              limit_val,
              offset_val,
            ],
            RawReport::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }
}
