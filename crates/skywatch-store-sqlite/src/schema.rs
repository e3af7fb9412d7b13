//! SQL schema for the Skywatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Timestamps are fixed-width RFC 3339 text (microseconds, `Z` suffix), so
//! `MAX()` and `<`/`>` on the text columns compare chronologically.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS owners (
    owner_id    INTEGER PRIMARY KEY,
    name        TEXT,
    updated_at  TEXT NOT NULL
);

-- One row per natural key. Rows are never deleted; departures set
-- status = 'deleted'.
CREATE TABLE IF NOT EXISTS bodies (
    galaxy      INTEGER NOT NULL,
    system      INTEGER NOT NULL,
    position    INTEGER NOT NULL,
    kind        TEXT    NOT NULL,   -- 'planet' | 'moon'
    owner_id    INTEGER REFERENCES owners(owner_id),
    source_id   INTEGER,
    name        TEXT,
    status      TEXT    NOT NULL,   -- 'new' | 'seen' | 'deleted'
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL,
    PRIMARY KEY (galaxy, system, position, kind)
);

-- Append-only change log. Written in the same transaction as the body
-- write that produced the event.
CREATE TABLE IF NOT EXISTS body_events (
    event_id    TEXT PRIMARY KEY,
    scan_id     TEXT    NOT NULL,
    galaxy      INTEGER NOT NULL,
    system      INTEGER NOT NULL,
    position    INTEGER NOT NULL,
    kind        TEXT    NOT NULL,
    event_type  TEXT    NOT NULL,   -- discriminant of DiffEvent
    event_json  TEXT    NOT NULL,
    recorded_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS region_freshness (
    region           TEXT PRIMARY KEY,   -- 'system:1:42' | 'stats:fleet'
    region_kind      TEXT NOT NULL,      -- 'system' | 'stats'
    galaxy           INTEGER,
    system           INTEGER,
    last_observed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    kind         TEXT    NOT NULL,
    external_id  INTEGER NOT NULL,
    galaxy       INTEGER,
    system       INTEGER,
    position     INTEGER,
    body_kind    TEXT,
    reported_by  INTEGER,
    report_time  TEXT,
    payload      TEXT    NOT NULL,   -- JSON object (inner data only)
    revision     INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT    NOT NULL,
    updated_at   TEXT    NOT NULL,
    PRIMARY KEY (kind, external_id)
);

CREATE INDEX IF NOT EXISTS body_events_system_idx ON body_events(galaxy, system);
CREATE INDEX IF NOT EXISTS body_events_time_idx   ON body_events(recorded_at);
CREATE INDEX IF NOT EXISTS reports_target_idx     ON reports(galaxy, system, position);
CREATE INDEX IF NOT EXISTS reports_time_idx       ON reports(report_time);

PRAGMA user_version = 1;
";
