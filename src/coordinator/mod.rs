//! Stream coordinator
//!
//! Owns the stream client, the in-memory buffers, the resampler and the
//! persistence handles. Each upstream message is normalized, applied to the
//! buffers and resampler under one write lock, and only then queued for
//! storage. Readers get copies and never see storage or transport errors.

mod state;

use crate::market::{Bar, Tick, Timeframe};
use crate::normalize;
use crate::store::{PersistenceStore, PersistenceWriter, WriterConfig};
use crate::stream::{MessageHandler, StreamClient, StreamConfig};
use crate::telemetry::{self, GaugeMetric, LatencyMetric};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use state::PipelineState;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Symbols subscribed when none are configured
pub const DEFAULT_SYMBOLS: [&str; 5] = ["btcusdt", "ethusdt", "solusdt", "bnbusdt", "xrpusdt"];

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Subscribed symbols (lowercased on construction)
    pub symbols: Vec<String>,
    /// Tick ring capacity per symbol
    pub tick_capacity: usize,
    /// Bar ring capacity per symbol, indexed by [`Timeframe::index`]
    pub bar_capacities: [usize; 3],
    /// Bars read from storage when a bar ring is empty
    pub cold_start_limit: usize,
    pub stream: StreamConfig,
    pub writer: WriterConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            tick_capacity: 2000,
            bar_capacities: Timeframe::ALL.map(Timeframe::default_capacity),
            cold_start_limit: 200,
            stream: StreamConfig::default(),
            writer: WriterConfig::default(),
        }
    }
}

/// Process-wide ingestion pipeline.
///
/// Construct once at startup and share the returned `Arc`.
pub struct StreamCoordinator {
    symbols: Vec<String>,
    cold_start_limit: usize,
    state: RwLock<PipelineState>,
    store: PersistenceStore,
    writer: PersistenceWriter,
    client: StreamClient,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StreamCoordinator {
    /// Build the coordinator and spawn its persistence writer.
    ///
    /// Must be called inside a tokio runtime. The stream is not connected
    /// until [`StreamCoordinator::start`].
    pub fn new(config: CoordinatorConfig, store: PersistenceStore) -> Arc<Self> {
        let symbols: Vec<String> = config.symbols.iter().map(|s| s.to_lowercase()).collect();
        let state = PipelineState::new(&symbols, config.tick_capacity, config.bar_capacities);
        let writer = PersistenceWriter::spawn(store.clone(), config.writer);

        Arc::new(Self {
            symbols,
            cold_start_limit: config.cold_start_limit,
            state: RwLock::new(state),
            store,
            writer,
            client: StreamClient::new(config.stream),
            worker: Mutex::new(None),
        })
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start the background stream worker.
    ///
    /// No-op while it is already running, and after [`StreamCoordinator::shutdown`].
    pub fn start(self: &Arc<Self>) {
        if self.client.is_stopped() {
            tracing::warn!("Stream coordinator was shut down; not restarting");
            return;
        }

        let mut worker = self.worker();
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Stream coordinator already running");
            return;
        }

        let this = Arc::clone(self);
        *worker = Some(tokio::spawn(async move {
            if let Err(e) = this.client.run(&this.symbols, &*this).await {
                tracing::error!(error = %e, "Stream worker exited");
            }
        }));

        tracing::info!(symbols = ?self.symbols, "Stream coordinator started");
    }

    /// Whether the background stream worker is alive
    pub fn is_running(&self) -> bool {
        self.worker()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the stream worker and flush pending writes. Terminal.
    pub async fn shutdown(&self) {
        self.client.stop();

        let handle = self.worker().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Stream worker panicked");
            }
        }

        if !self.writer.flush().await {
            tracing::warn!("Persistence writer already stopped");
        }
        tracing::info!("Stream coordinator stopped");
    }

    /// Run one raw upstream message through the pipeline
    pub async fn handle_message(&self, raw: &str) {
        let started = Instant::now();

        let tick = match normalize::parse(raw) {
            Ok(tick) => tick,
            Err(e) => {
                telemetry::record_rejected(e.kind());
                tracing::debug!(error = %e, "Dropping malformed message");
                return;
            }
        };

        let completed = {
            let mut state = self.state.write().await;
            let completed = state.apply(&tick);
            telemetry::set_gauge(GaugeMetric::OpenBars, state.open_bars() as f64);
            completed
        };

        telemetry::record_tick(&tick.symbol);
        telemetry::record_latency(LatencyMetric::Pipeline, started.elapsed());
        if let Ok(lag) = (Utc::now() - tick.timestamp).to_std() {
            telemetry::record_latency(LatencyMetric::FeedLag, lag);
        }

        self.writer.persist_tick(tick).await;
        for (timeframe, bar) in completed {
            telemetry::record_bar_completed(timeframe);
            tracing::debug!(
                symbol = %bar.symbol,
                timeframe = %timeframe,
                timestamp = %bar.timestamp,
                close = %bar.close,
                "Bar completed"
            );
            self.writer.persist_bar(timeframe, bar).await;
        }
    }

    /// Last traded price, or zero before the first tick
    pub async fn latest_price(&self, symbol: &str) -> Decimal {
        self.state
            .read()
            .await
            .latest_price(&symbol.to_lowercase())
            .unwrap_or(Decimal::ZERO)
    }

    /// Completed bars, oldest first.
    ///
    /// Served from memory when the ring has data; otherwise read from
    /// storage without filling the ring, so every cold read hits storage.
    pub async fn bars(&self, timeframe: Timeframe, symbol: &str) -> Vec<Bar> {
        let symbol = symbol.to_lowercase();
        let buffered = self.state.read().await.bars(timeframe, &symbol);
        if !buffered.is_empty() {
            return buffered;
        }

        let store = self.store.clone();
        let owned_symbol = symbol.clone();
        let limit = self.cold_start_limit;
        match tokio::task::spawn_blocking(move || store.bars(timeframe, &owned_symbol, limit)).await
        {
            Ok(Ok(bars)) => bars,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, symbol = %symbol, timeframe = %timeframe, "Cold-start bar read failed");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "Cold-start bar read panicked");
                Vec::new()
            }
        }
    }

    /// Buffered ticks, oldest first
    pub async fn recent_ticks(&self, symbol: &str) -> Vec<Tick> {
        self.state.read().await.ticks(&symbol.to_lowercase())
    }

    /// The bar still being built for a timeframe and symbol
    pub async fn current_bar(&self, timeframe: Timeframe, symbol: &str) -> Option<Bar> {
        self.state
            .read()
            .await
            .current_bar(timeframe, &symbol.to_lowercase())
    }

    /// Number of completed bars held in memory
    pub async fn buffered_bars(&self, timeframe: Timeframe, symbol: &str) -> usize {
        self.state
            .read()
            .await
            .buffered_bars(timeframe, &symbol.to_lowercase())
    }

    /// Subscribed symbols
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Persistence writer, for stats and explicit flushes
    pub fn writer(&self) -> &PersistenceWriter {
        &self.writer
    }

    /// Underlying store
    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }
}

#[async_trait]
impl MessageHandler for StreamCoordinator {
    async fn on_message(&self, raw: &str) {
        self.handle_message(raw).await;
    }
}
