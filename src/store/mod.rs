//! Durable tick and bar storage
//!
//! SQLite-backed append-only tick log and per-timeframe bar tables, plus a
//! background writer that keeps storage I/O off the ingestion path.

mod sqlite;
mod writer;

pub use sqlite::{BatchOutcome, PersistenceStore};
pub use writer::{PersistenceWriter, WriterConfig, WriterStats};

use crate::market::{Bar, Tick, Timeframe};
use thiserror::Error;

/// A single pending write
#[derive(Debug, Clone)]
pub enum PersistJob {
    /// Insert a tick unless its (symbol, timestamp) is already stored
    Tick(Tick),
    /// Insert or overwrite a completed bar
    Bar(Timeframe, Bar),
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A thread panicked while holding the connection
    #[error("Connection lock poisoned")]
    LockPoisoned,
    /// Stored timestamp text could not be parsed
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
    /// Stored value could not be converted back
    #[error("Invalid stored number: {0}")]
    InvalidNumber(f64),
}

pub type Result<T> = std::result::Result<T, StoreError>;
