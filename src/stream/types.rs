//! Stream client types and configuration

use std::time::Duration;
use thiserror::Error;

/// Binance USD-M futures raw stream endpoint
pub const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com/ws";

/// Stream client configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket base URL; stream names are appended as path segments
    pub base_url: String,
    /// Stream type subscribed per symbol (`trade` or `aggTrade`)
    pub stream_type: String,
    /// Fixed delay before each reconnection attempt
    pub reconnect_delay: Duration,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
    /// Timeout for pong response
    pub pong_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_FUTURES_WS_URL.to_string(),
            stream_type: "trade".to_string(),
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

impl StreamConfig {
    /// Create a new config with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the per-symbol stream type
    pub fn stream_type(mut self, stream_type: impl Into<String>) -> Self {
        self.stream_type = stream_type.into();
        self
    }

    /// Set reconnection delay
    pub fn reconnect_delay(mut self, d: Duration) -> Self {
        self.reconnect_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Set pong timeout
    pub fn pong_timeout(mut self, d: Duration) -> Self {
        self.pong_timeout = d;
        self
    }

    /// Subscription URL covering all symbols, e.g.
    /// `wss://fstream.binance.com/ws/btcusdt@trade/ethusdt@trade`
    pub fn url_for(&self, symbols: &[String]) -> String {
        let streams: Vec<String> = symbols
            .iter()
            .map(|s| format!("{}@{}", s.to_lowercase(), self.stream_type))
            .collect();
        format!("{}/{}", self.base_url.trim_end_matches('/'), streams.join("/"))
    }
}

/// Stream client errors
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Connection failed or dropped
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
    /// No pong within the timeout
    #[error("Pong timeout")]
    PongTimeout,
    /// Nothing to subscribe to
    #[error("No symbols to subscribe")]
    NoSymbols,
}
