//! Configuration types for tick-bars

use crate::coordinator::{CoordinatorConfig, DEFAULT_SYMBOLS};
use crate::market::Timeframe;
use crate::store::WriterConfig;
use crate::stream::{StreamConfig, BINANCE_FUTURES_WS_URL};
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub buffers: BufferConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream WebSocket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Stream suffix, e.g. `trade` or `aggTrade`
    #[serde(default = "default_stream_type")]
    pub stream_type: String,

    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
}

fn default_base_url() -> String {
    BINANCE_FUTURES_WS_URL.to_string()
}
fn default_stream_type() -> String {
    "trade".to_string()
}
fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_ping_interval_secs() -> u64 {
    30
}
fn default_pong_timeout_secs() -> u64 {
    10
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_type: default_stream_type(),
            symbols: default_symbols(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
        }
    }
}

impl StreamSection {
    /// Client settings for this section
    pub fn client_config(&self) -> StreamConfig {
        StreamConfig::new(&self.base_url)
            .stream_type(&self.stream_type)
            .reconnect_delay(Duration::from_secs(self.reconnect_delay_secs))
            .ping_interval(Duration::from_secs(self.ping_interval_secs))
            .pong_timeout(Duration::from_secs(self.pong_timeout_secs))
    }
}

/// SQLite persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Jobs per write transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Bars read from storage when a bar buffer is empty
    #[serde(default = "default_cold_start_limit")]
    pub cold_start_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("market_data.db")
}
fn default_batch_size() -> usize {
    500
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_queue_capacity() -> usize {
    10_000
}
fn default_cold_start_limit() -> usize {
    200
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            queue_capacity: default_queue_capacity(),
            cold_start_limit: default_cold_start_limit(),
        }
    }
}

impl StorageConfig {
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            batch_size: self.batch_size,
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            queue_capacity: self.queue_capacity,
        }
    }
}

/// In-memory buffer capacities, per symbol
#[derive(Debug, Clone, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_tick_capacity")]
    pub tick_capacity: usize,

    /// One hour of 1s bars
    #[serde(default = "default_bars_1s")]
    pub bars_1s: usize,

    /// One day of 1m bars
    #[serde(default = "default_bars_1m")]
    pub bars_1m: usize,

    /// One day of 5m bars
    #[serde(default = "default_bars_5m")]
    pub bars_5m: usize,
}

fn default_tick_capacity() -> usize {
    2000
}
fn default_bars_1s() -> usize {
    Timeframe::S1.default_capacity()
}
fn default_bars_1m() -> usize {
    Timeframe::M1.default_capacity()
}
fn default_bars_5m() -> usize {
    Timeframe::M5.default_capacity()
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            tick_capacity: default_tick_capacity(),
            bars_1s: default_bars_1s(),
            bars_1m: default_bars_1m(),
            bars_5m: default_bars_5m(),
        }
    }
}

impl BufferConfig {
    /// Bar capacities indexed by [`Timeframe::index`]
    pub fn bar_capacities(&self) -> [usize; 3] {
        [self.bars_1s, self.bars_1m, self.bars_5m]
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus listener port; no exporter when unset
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream.symbols.is_empty() {
            anyhow::bail!("stream.symbols must not be empty");
        }
        if self.stream.ping_interval_secs == 0 {
            anyhow::bail!("stream.ping_interval_secs must be greater than zero");
        }
        if self.stream.pong_timeout_secs == 0 {
            anyhow::bail!("stream.pong_timeout_secs must be greater than zero");
        }
        if self.storage.flush_interval_ms == 0 {
            anyhow::bail!("storage.flush_interval_ms must be greater than zero");
        }
        Ok(())
    }

    /// Settings for the stream coordinator
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            symbols: self.stream.symbols.iter().map(|s| s.to_lowercase()).collect(),
            tick_capacity: self.buffers.tick_capacity,
            bar_capacities: self.buffers.bar_capacities(),
            cold_start_limit: self.storage.cold_start_limit,
            stream: self.stream.client_config(),
            writer: self.storage.writer_config(),
        }
    }
}
