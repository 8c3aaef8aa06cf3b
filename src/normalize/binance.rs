//! Binance trade stream messages

use super::NormalizeError;
use crate::market::Tick;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Event type of the raw trade stream
const TRADE_EVENT: &str = "trade";
/// Event type of the aggregate trade stream
const AGG_TRADE_EVENT: &str = "aggTrade";

/// Fields shared by `trade` and `aggTrade` events
#[derive(Debug, Deserialize)]
struct TradePayload {
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Quantity
    #[serde(rename = "q")]
    quantity: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Parse a Binance trade or aggTrade message into a [`Tick`].
///
/// Messages wrapped in the combined-stream envelope
/// (`{"stream": ..., "data": {...}}`) are unwrapped first.
pub fn parse(raw: &str) -> Result<Tick, NormalizeError> {
    let mut value: Value = serde_json::from_str(raw).map_err(NormalizeError::InvalidJson)?;

    if value.get("stream").is_some() {
        if let Some(data) = value.get_mut("data").map(Value::take) {
            value = data;
        }
    }

    let event = value
        .get("e")
        .and_then(Value::as_str)
        .ok_or(NormalizeError::MissingEventType)?;
    if event != TRADE_EVENT && event != AGG_TRADE_EVENT {
        return Err(NormalizeError::UnsupportedEvent(event.to_string()));
    }

    let trade: TradePayload =
        serde_json::from_value(value).map_err(NormalizeError::InvalidPayload)?;

    let price = parse_decimal("price", &trade.price)?;
    if price <= Decimal::ZERO {
        return Err(NormalizeError::OutOfRange {
            field: "price",
            value: trade.price,
        });
    }
    let size = parse_decimal("quantity", &trade.quantity)?;
    if size < Decimal::ZERO {
        return Err(NormalizeError::OutOfRange {
            field: "quantity",
            value: trade.quantity,
        });
    }

    let timestamp = Utc
        .timestamp_millis_opt(trade.trade_time)
        .single()
        .ok_or(NormalizeError::InvalidTimestamp(trade.trade_time))?;

    Ok(Tick::new(trade.symbol, timestamp, price, size))
}

fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, NormalizeError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| NormalizeError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}
