//! Tick normalizer
//!
//! Turns raw venue messages into [`Tick`]s. Malformed messages are rejected
//! with a [`NormalizeError`] and never panic; callers drop them.

mod binance;

pub use binance::parse;

use thiserror::Error;

/// Reasons a raw message could not become a tick
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// No event type discriminator
    #[error("Missing event type")]
    MissingEventType,
    /// Event type that is not a trade
    #[error("Unsupported event type: {0}")]
    UnsupportedEvent(String),
    /// Trade payload missing a field or with a wrong type
    #[error("Invalid trade payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// Price or quantity is not a decimal number
    #[error("Invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
    /// Price must be positive, quantity non-negative
    #[error("Out of range {field}: {value}")]
    OutOfRange { field: &'static str, value: String },
    /// Trade time cannot be represented
    #[error("Invalid trade time: {0}")]
    InvalidTimestamp(i64),
}

impl NormalizeError {
    /// Short reason label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizeError::InvalidJson(_) => "invalid_json",
            NormalizeError::MissingEventType => "missing_event_type",
            NormalizeError::UnsupportedEvent(_) => "unsupported_event",
            NormalizeError::InvalidPayload(_) => "invalid_payload",
            NormalizeError::InvalidNumber { .. } => "invalid_number",
            NormalizeError::OutOfRange { .. } => "out_of_range",
            NormalizeError::InvalidTimestamp(_) => "invalid_timestamp",
        }
    }
}
