//! SQLite persistence store

use super::{PersistJob, Result, StoreError};
use crate::market::{format_timestamp, parse_timestamp, Bar, Tick, Timeframe};
use rusqlite::{params, Connection};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const INSERT_TICK: &str =
    "INSERT OR IGNORE INTO ticks (symbol, timestamp, price, size) VALUES (?1, ?2, ?3, ?4)";

/// Result of writing a batch of jobs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub ticks_written: u64,
    /// Ticks skipped because their (symbol, timestamp) was already stored
    pub ticks_ignored: u64,
    pub bars_written: u64,
    /// Jobs whose statement failed; the rest of the batch still commits
    pub failed: u64,
}

/// Handle to the tick and bar database.
///
/// Cloning shares one internally synchronized connection, so the store can
/// be used from any thread.
#[derive(Clone)]
pub struct PersistenceStore {
    conn: Arc<Mutex<Connection>>,
}

impl PersistenceStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Insert a tick. Returns 0 when the (symbol, timestamp) already exists.
    pub fn insert_tick(&self, tick: &Tick) -> Result<usize> {
        let conn = self.lock()?;
        Ok(insert_tick_on(&conn, tick)?)
    }

    /// Insert a bar, replacing any row with the same (symbol, timestamp)
    pub fn insert_or_replace_bar(&self, timeframe: Timeframe, bar: &Bar) -> Result<usize> {
        let conn = self.lock()?;
        Ok(upsert_bar_on(&conn, timeframe, bar)?)
    }

    /// Write a batch of jobs in one transaction.
    ///
    /// A failing row is logged and counted; it does not roll back the others.
    pub fn write_batch(&self, jobs: &[PersistJob]) -> Result<BatchOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut outcome = BatchOutcome::default();

        for job in jobs {
            match job {
                PersistJob::Tick(tick) => match insert_tick_on(&tx, tick) {
                    Ok(0) => outcome.ticks_ignored += 1,
                    Ok(_) => outcome.ticks_written += 1,
                    Err(e) => {
                        outcome.failed += 1;
                        tracing::warn!(error = %e, symbol = %tick.symbol, "Failed to insert tick");
                    }
                },
                PersistJob::Bar(timeframe, bar) => match upsert_bar_on(&tx, *timeframe, bar) {
                    Ok(_) => outcome.bars_written += 1,
                    Err(e) => {
                        outcome.failed += 1;
                        tracing::warn!(
                            error = %e,
                            symbol = %bar.symbol,
                            timeframe = %timeframe,
                            "Failed to insert bar"
                        );
                    }
                },
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Most recent ticks for a symbol, newest first
    pub fn recent_ticks(&self, symbol: &str, limit: usize) -> Result<Vec<Tick>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT symbol, timestamp, price, size FROM ticks
             WHERE symbol = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![symbol, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(symbol, ts, price, size)| {
                Ok(Tick {
                    symbol,
                    timestamp: to_timestamp(&ts)?,
                    price: to_decimal(price)?,
                    size: to_decimal(size)?,
                })
            })
            .collect()
    }

    /// Most recent `limit` bars for a symbol, oldest first
    pub fn bars(&self, timeframe: Timeframe, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT symbol, timestamp, open, high, low, close, volume FROM {}
             WHERE symbol = ?1 ORDER BY timestamp DESC LIMIT ?2",
            timeframe.table_name()
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![symbol, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    [
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                    ],
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Scanned newest first; callers want chronological order.
        rows.into_iter()
            .rev()
            .map(|(symbol, ts, [open, high, low, close, volume])| {
                Ok(Bar {
                    symbol,
                    timestamp: to_timestamp(&ts)?,
                    open: to_decimal(open)?,
                    high: to_decimal(high)?,
                    low: to_decimal(low)?,
                    close: to_decimal(close)?,
                    volume: to_decimal(volume)?,
                })
            })
            .collect()
    }

    /// Number of stored ticks for a symbol
    pub fn count_ticks(&self, symbol: &str) -> Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ticks WHERE symbol = ?1",
            params![symbol],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Number of stored bars for a timeframe and symbol
    pub fn count_bars(&self, timeframe: Timeframe, symbol: &str) -> Result<u64> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE symbol = ?1",
            timeframe.table_name()
        );
        let n: i64 = conn.query_row(&sql, params![symbol], |row| row.get(0))?;
        Ok(n as u64)
    }
}

impl std::fmt::Debug for PersistenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceStore").finish_non_exhaustive()
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    // Best-effort; in-memory databases ignore WAL.
    let _ = conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS ticks (
            symbol TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            price REAL,
            size REAL,
            PRIMARY KEY (symbol, timestamp)
        );
        CREATE INDEX IF NOT EXISTS idx_ticks_ts ON ticks(timestamp);
        "#,
    )?;

    for tf in Timeframe::ALL {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                volume REAL,
                PRIMARY KEY (symbol, timestamp)
            );
            "#,
            tf.table_name()
        ))?;
    }

    Ok(())
}

fn insert_tick_on(conn: &Connection, tick: &Tick) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(INSERT_TICK)?;
    stmt.execute(params![
        tick.symbol,
        format_timestamp(&tick.timestamp),
        to_real(tick.price),
        to_real(tick.size),
    ])
}

fn upsert_bar_on(conn: &Connection, timeframe: Timeframe, bar: &Bar) -> rusqlite::Result<usize> {
    let sql = format!(
        "INSERT OR REPLACE INTO {} (symbol, timestamp, open, high, low, close, volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        timeframe.table_name()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.execute(params![
        bar.symbol,
        format_timestamp(&bar.timestamp),
        to_real(bar.open),
        to_real(bar.high),
        to_real(bar.low),
        to_real(bar.close),
        to_real(bar.volume),
    ])
}

fn to_real(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value).ok_or(StoreError::InvalidNumber(value))
}

fn to_timestamp(text: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(text).map_err(|_| StoreError::InvalidTimestamp(text.to_string()))
}
