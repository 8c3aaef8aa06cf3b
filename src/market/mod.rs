//! Market data model
//!
//! Normalized trade ticks, OHLCV bars and the fixed set of bar timeframes

mod timeframe;
mod types;

pub use timeframe::{ParseTimeframeError, Timeframe};
pub use types::{format_timestamp, parse_timestamp, Bar, Tick};
