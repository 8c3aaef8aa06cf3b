//! Tick and bar types

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single normalized trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Lowercase venue symbol (e.g., "btcusdt")
    pub symbol: String,
    /// Exchange trade time
    pub timestamp: DateTime<Utc>,
    /// Trade price
    pub price: Decimal,
    /// Trade quantity
    pub size: Decimal,
}

impl Tick {
    /// Create a tick, lowercasing the symbol
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into().to_lowercase(),
            timestamp,
            price,
            size,
        }
    }
}

/// OHLCV bar over one timeframe interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    /// Interval start (floored)
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Open a new bar from its first tick
    pub fn open_with(tick: &Tick, boundary: DateTime<Utc>) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            timestamp: boundary,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.size,
        }
    }

    /// Fold another tick of the same interval into the bar
    pub fn apply(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        self.volume += tick.size;
    }
}

/// Render a timestamp the way it is keyed in storage.
///
/// Fixed-width RFC 3339 with milliseconds and a `Z` suffix, so text order
/// matches time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into UTC
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
