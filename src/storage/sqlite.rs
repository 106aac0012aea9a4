//! SQLite-backed refresh history
//!
//! Timestamps are stored as Unix milliseconds.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{
    InstrumentIds, JobRunRecord, ProviderEventRecord, RefreshStore, SnapshotReader, SnapshotRecord,
    StoredSeries,
};
use crate::client::ProviderStats;
use crate::config::Instrument;
use crate::error::{Result, StorageError};
use crate::models::{JobRunOutcome, JobStatus, Module, RangeKey, SparkPoint, SummaryItem};

/// Schema version - increment to trigger drop-and-rebuild
const SCHEMA_VERSION: i32 = 2;

const STATS_EVENT: &str = "stats_snapshot";

type StorageResult<T> = std::result::Result<T, StorageError>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS instruments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        instrument_key TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        ticker TEXT NOT NULL,
        module TEXT NOT NULL,
        unit_label TEXT,
        price_type TEXT,
        sort_order INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS quote_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        instrument_id INTEGER NOT NULL REFERENCES instruments(id),
        fetched_at INTEGER NOT NULL,
        observed_at INTEGER,
        last REAL,
        day_abs REAL,
        day_pct REAL,
        w1_pct REAL,
        ytd_pct REAL,
        y1_pct REAL,
        is_stale INTEGER NOT NULL,
        sparkline TEXT
    );

    CREATE TABLE IF NOT EXISTS series_points (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        instrument_id INTEGER NOT NULL REFERENCES instruments(id),
        series_type TEXT NOT NULL,
        range_key TEXT NOT NULL,
        point_time INTEGER NOT NULL,
        value REAL NOT NULL,
        fetched_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS job_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_name TEXT NOT NULL,
        started_at INTEGER NOT NULL,
        finished_at INTEGER,
        status TEXT NOT NULL,
        ok_count INTEGER NOT NULL DEFAULT 0,
        fail_count INTEGER NOT NULL DEFAULT 0,
        notes TEXT
    );

    CREATE TABLE IF NOT EXISTS provider_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        provider TEXT NOT NULL,
        event_type TEXT NOT NULL,
        attempts INTEGER NOT NULL,
        success INTEGER NOT NULL,
        fail INTEGER NOT NULL,
        retries INTEGER NOT NULL,
        last_error TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_quote_snapshots_instrument
        ON quote_snapshots(instrument_id, fetched_at);
    CREATE INDEX IF NOT EXISTS idx_series_points_key
        ON series_points(instrument_id, series_type, range_key);
    CREATE INDEX IF NOT EXISTS idx_job_runs_started ON job_runs(started_at);
    CREATE INDEX IF NOT EXISTS idx_provider_events_created ON provider_events(created_at);
"#;

const DROP_ALL: &str = r#"
    DROP TABLE IF EXISTS provider_events;
    DROP TABLE IF EXISTS job_runs;
    DROP TABLE IF EXISTS series_points;
    DROP TABLE IF EXISTS quote_snapshots;
    DROP TABLE IF EXISTS instruments;
"#;

fn to_millis(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

fn from_millis(value: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value).unwrap_or_default()
}

/// SQLite store behind a mutex; each call holds the lock only for its
/// own statements.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file, creating parent directories.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Io(format!("Failed to create data dir: {}", e)))?;
        }
        let conn = Connection::open(path).map_err(StorageError::from)?;
        Ok(Self::init(conn)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self::init(conn)?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Database schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            conn.execute_batch(DROP_ALL)?;
        }

        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StorageResult<T>) -> Result<T> {
        let mut conn = self.lock()?;
        Ok(f(&mut conn)?)
    }

    /// Most recent job runs, newest first.
    pub fn recent_job_runs(&self, limit: usize) -> Result<Vec<JobRunRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, job_name, started_at, finished_at, status, ok_count, fail_count, notes
                 FROM job_runs ORDER BY started_at DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map([limit as i64], job_run_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Provider rows from the most recent snapshot.
    pub fn latest_provider_stats(&self) -> Result<Vec<ProviderEventRecord>> {
        self.with_conn(|conn| {
            let latest: Option<i64> = conn
                .query_row(
                    "SELECT MAX(created_at) FROM provider_events WHERE event_type = ?1",
                    [STATS_EVENT],
                    |r| r.get(0),
                )
                .optional()?
                .flatten();

            let Some(latest) = latest else {
                return Ok(Vec::new());
            };

            let mut stmt = conn.prepare(
                "SELECT provider, event_type, attempts, success, fail, retries, last_error,
                        created_at
                 FROM provider_events WHERE event_type = ?1 AND created_at = ?2
                 ORDER BY provider",
            )?;
            let rows = stmt.query_map(params![STATS_EVENT, latest], |row| {
                Ok(ProviderEventRecord {
                    provider: row.get(0)?,
                    event_type: row.get(1)?,
                    attempts: row.get(2)?,
                    success: row.get(3)?,
                    fail: row.get(4)?,
                    retries: row.get(5)?,
                    last_error: row.get(6)?,
                    created_at: from_millis(row.get(7)?),
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Number of stored quote snapshots for an instrument id.
    #[cfg(test)]
    pub fn snapshot_count(&self, instrument_key: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM quote_snapshots q
                 JOIN instruments i ON i.id = q.instrument_id
                 WHERE i.instrument_key = ?1",
                [instrument_key],
                |r| r.get(0),
            )?;
            Ok(count as usize)
        })
    }
}

fn module_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Module> {
    let raw: String = row.get(idx)?;
    raw.parse::<Module>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRecord> {
    let sparkline: Option<String> = row.get(12)?;
    Ok(SnapshotRecord {
        instrument_key: row.get(0)?,
        module: module_from_row(row, 1)?,
        fetched_at: from_millis(row.get(2)?),
        observed_at: row.get::<_, Option<i64>>(3)?.map(from_millis),
        last: row.get(4)?,
        day_abs: row.get(5)?,
        day_pct: row.get(6)?,
        w1_pct: row.get(7)?,
        ytd_pct: row.get(8)?,
        y1_pct: row.get(9)?,
        is_stale: row.get(10)?,
        // 11 is sort_order, only used for ordering
        sparkline: sparkline
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default(),
    })
}

fn job_run_from_row(row: &Row<'_>) -> rusqlite::Result<JobRunRecord> {
    let status: String = row.get(4)?;
    Ok(JobRunRecord {
        id: row.get(0)?,
        job_name: row.get(1)?,
        started_at: from_millis(row.get(2)?),
        finished_at: row.get::<_, Option<i64>>(3)?.map(from_millis),
        status: JobStatus::parse(&status).unwrap_or(JobStatus::Running),
        ok_count: row.get(5)?,
        fail_count: row.get(6)?,
        notes: row.get(7)?,
    })
}

impl RefreshStore for SqliteStore {
    fn upsert_instruments(&self, instruments: &[Instrument]) -> Result<InstrumentIds> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut ids = InstrumentIds::new();
            {
                let mut upsert = tx.prepare(
                    "INSERT INTO instruments
                     (instrument_key, name, ticker, module, unit_label, price_type, sort_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(instrument_key) DO UPDATE SET
                        name = excluded.name,
                        ticker = excluded.ticker,
                        module = excluded.module,
                        unit_label = excluded.unit_label,
                        price_type = excluded.price_type,
                        sort_order = excluded.sort_order",
                )?;
                let mut lookup =
                    tx.prepare("SELECT id FROM instruments WHERE instrument_key = ?1")?;

                for item in instruments {
                    upsert.execute(params![
                        item.id,
                        item.name,
                        item.ticker,
                        item.module.as_str(),
                        item.unit_label,
                        item.price_type,
                        item.sort_order,
                    ])?;
                    let id: i64 = lookup.query_row([&item.id], |r| r.get(0))?;
                    ids.insert(item.id.clone(), id);
                }
            }
            tx.commit()?;
            Ok(ids)
        })
    }

    fn begin_job_run(&self, job_name: &str, started_at: DateTime<Utc>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO job_runs (job_name, started_at, status, ok_count, fail_count)
                 VALUES (?1, ?2, ?3, 0, 0)",
                params![job_name, to_millis(started_at), JobStatus::Running.as_str()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn store_summary_items(
        &self,
        ids: &InstrumentIds,
        items: &[SummaryItem],
        fetched_at: DateTime<Utc>,
    ) -> Result<usize> {
        let sparklines = items
            .iter()
            .map(|item| serde_json::to_string(&item.sparkline))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut stored = 0;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO quote_snapshots
                     (instrument_id, fetched_at, observed_at, last, day_abs, day_pct, w1_pct,
                      ytd_pct, y1_pct, is_stale, sparkline)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )?;
                for (item, sparkline) in items.iter().zip(&sparklines) {
                    let Some(instrument_id) = ids.get(&item.id) else {
                        continue;
                    };
                    insert.execute(params![
                        instrument_id,
                        to_millis(fetched_at),
                        item.timestamp.map(to_millis),
                        item.last,
                        item.day_abs,
                        item.day_pct,
                        item.w1_pct,
                        item.ytd_pct,
                        item.y1_pct,
                        item.is_stale,
                        sparkline,
                    ])?;
                    stored += 1;
                }
            }
            tx.commit()?;
            Ok(stored)
        })
    }

    fn replace_series_points(
        &self,
        instrument_id: i64,
        series_type: &str,
        range: RangeKey,
        points: &[SparkPoint],
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM series_points
                 WHERE instrument_id = ?1 AND series_type = ?2 AND range_key = ?3",
                params![instrument_id, series_type, range.as_str()],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO series_points
                     (instrument_id, series_type, range_key, point_time, value, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for point in points {
                    insert.execute(params![
                        instrument_id,
                        series_type,
                        range.as_str(),
                        to_millis(point.t),
                        point.v,
                        to_millis(fetched_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn record_provider_stats(
        &self,
        stats: &BTreeMap<String, ProviderStats>,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO provider_events
                     (provider, event_type, attempts, success, fail, retries, last_error,
                      created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for (provider, row) in stats {
                    insert.execute(params![
                        provider,
                        STATS_EVENT,
                        row.attempts as i64,
                        row.success as i64,
                        row.fail as i64,
                        row.retries as i64,
                        row.last_error,
                        to_millis(created_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn complete_job_run(&self, run_id: i64, outcome: &JobRunOutcome) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE job_runs
                 SET finished_at = ?1, status = ?2, ok_count = ?3, fail_count = ?4, notes = ?5
                 WHERE id = ?6",
                params![
                    to_millis(outcome.finished_at),
                    outcome.status.as_str(),
                    outcome.ok_count as i64,
                    outcome.fail_count as i64,
                    outcome.notes,
                    run_id,
                ],
            )?;
            if updated == 0 {
                return Err(StorageError::Database(rusqlite::Error::QueryReturnedNoRows));
            }
            Ok(())
        })
    }
}

impl SnapshotReader for SqliteStore {
    fn latest_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.instrument_key, i.module, q.fetched_at, q.observed_at, q.last,
                        q.day_abs, q.day_pct, q.w1_pct, q.ytd_pct, q.y1_pct, q.is_stale,
                        i.sort_order, q.sparkline
                 FROM quote_snapshots q
                 JOIN instruments i ON i.id = q.instrument_id
                 WHERE q.id = (
                     SELECT MAX(latest.id) FROM quote_snapshots latest
                     WHERE latest.instrument_id = q.instrument_id
                 )
                 ORDER BY i.module, i.sort_order",
            )?;
            let rows = stmt.query_map([], snapshot_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn stored_series(
        &self,
        instrument_key: &str,
        series_type: &str,
        range: RangeKey,
    ) -> Result<Option<StoredSeries>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.point_time, s.value, s.fetched_at FROM series_points s
                 JOIN instruments i ON i.id = s.instrument_id
                 WHERE i.instrument_key = ?1 AND s.series_type = ?2 AND s.range_key = ?3
                 ORDER BY s.point_time",
            )?;
            let rows = stmt.query_map(params![instrument_key, series_type, range.as_str()], |row| {
                Ok((
                    SparkPoint {
                        t: from_millis(row.get(0)?),
                        v: row.get(1)?,
                    },
                    from_millis(row.get(2)?),
                ))
            })?;

            let mut points = Vec::new();
            let mut fetched_at: Option<DateTime<Utc>> = None;
            for row in rows {
                let (point, written) = row?;
                points.push(point);
                fetched_at = Some(fetched_at.map_or(written, |prev| prev.max(written)));
            }
            Ok(fetched_at.map(|fetched_at| StoredSeries { points, fetched_at }))
        })
    }

    fn freshness_marks(&self) -> Result<BTreeMap<Module, DateTime<Utc>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.module, MAX(q.fetched_at) FROM quote_snapshots q
                 JOIN instruments i ON i.id = q.instrument_id
                 WHERE q.last IS NOT NULL
                 GROUP BY i.module",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((module_from_row(row, 0)?, from_millis(row.get(1)?)))
            })?;
            Ok(rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()?)
        })
    }
}
