//! Bar timeframes

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed aggregation interval for OHLCV bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// One second bars
    #[serde(rename = "1s")]
    S1,
    /// One minute bars
    #[serde(rename = "1m")]
    M1,
    /// Five minute bars
    #[serde(rename = "5m")]
    M5,
}

/// Returned when a timeframe label is not one of the supported intervals
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown timeframe: {0}")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    /// All timeframes, shortest first. Completed bars are emitted in this order.
    pub const ALL: [Timeframe; 3] = [Timeframe::S1, Timeframe::M1, Timeframe::M5];

    /// Interval length in seconds
    pub const fn interval_secs(self) -> i64 {
        match self {
            Timeframe::S1 => 1,
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
        }
    }

    /// Position in [`Timeframe::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Timeframe::S1 => 0,
            Timeframe::M1 => 1,
            Timeframe::M5 => 2,
        }
    }

    /// Short label used in config, logs and metrics
    pub const fn label(self) -> &'static str {
        match self {
            Timeframe::S1 => "1s",
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
        }
    }

    /// Storage table holding completed bars of this timeframe
    pub const fn table_name(self) -> &'static str {
        match self {
            Timeframe::S1 => "bars_1s",
            Timeframe::M1 => "bars_1m",
            Timeframe::M5 => "bars_5m",
        }
    }

    /// Default in-memory ring capacity (one hour, one day, one day)
    pub const fn default_capacity(self) -> usize {
        match self {
            Timeframe::S1 => 3600,
            Timeframe::M1 => 1440,
            Timeframe::M5 => 288,
        }
    }

    /// Floor a timestamp to the start of its interval.
    ///
    /// Sub-second precision is dropped before flooring, so every timeframe
    /// aligns on whole epoch seconds.
    pub fn align(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = ts.timestamp();
        let floored = secs - secs.rem_euclid(self.interval_secs());
        Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1s" | "1S" => Ok(Timeframe::S1),
            "1m" | "1Min" => Ok(Timeframe::M1),
            "5m" | "5Min" => Ok(Timeframe::M5),
            other => Err(ParseTimeframeError(other.to_string())),
        }
    }
}
