//! Upstream trade stream client
//!
//! One WebSocket subscription covering every symbol, reconnected with a
//! fixed backoff until stopped.

mod client;
mod types;

pub use client::StreamClient;
pub use types::{StreamConfig, StreamError, BINANCE_FUTURES_WS_URL};

use async_trait::async_trait;

/// Receives raw upstream messages in arrival order.
///
/// The client awaits each call before reading the next message, so a slow
/// handler throttles the subscription instead of growing a queue.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, raw: &str);
}
