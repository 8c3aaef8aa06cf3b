//! Background persistence writer
//!
//! Ticks and completed bars are queued on a bounded channel and written in
//! batches on a blocking thread, so the ingestion path only pays for a
//! channel send.

use super::{PersistJob, PersistenceStore};
use crate::market::{Bar, Tick, Timeframe};
use crate::telemetry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Configuration for the persistence writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Jobs buffered before a flush is forced
    pub batch_size: usize,
    /// Maximum time between flushes
    pub flush_interval: Duration,
    /// Bounded queue length between the pipeline and the writer
    pub queue_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval: Duration::from_millis(1000),
            queue_capacity: 10_000,
        }
    }
}

/// Writer statistics
#[derive(Debug, Default, Clone)]
pub struct WriterStats {
    pub ticks_received: u64,
    pub bars_received: u64,
    pub ticks_written: u64,
    /// Duplicate ticks the store already held
    pub ticks_ignored: u64,
    pub bars_written: u64,
    pub failed: u64,
    pub batches: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

/// Floor for the flush timer; a zero period would panic the writer task
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

enum Command {
    Job(PersistJob),
    Flush(oneshot::Sender<()>),
}

/// Queues writes for a [`PersistenceStore`] and applies them in the background.
///
/// Storage failures are logged and counted, never returned: durability is
/// best-effort relative to the in-memory state.
#[derive(Clone)]
pub struct PersistenceWriter {
    tx: mpsc::Sender<Command>,
    stats: Arc<RwLock<WriterStats>>,
}

impl PersistenceWriter {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(store: PersistenceStore, config: WriterConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(RwLock::new(WriterStats::default()));

        let task_stats = stats.clone();
        tokio::spawn(async move {
            Self::run(rx, store, config, task_stats).await;
        });

        Self { tx, stats }
    }

    async fn run(
        mut rx: mpsc::Receiver<Command>,
        store: PersistenceStore,
        config: WriterConfig,
        stats: Arc<RwLock<WriterStats>>,
    ) {
        let batch_size = config.batch_size.max(1);
        let mut buffer: Vec<PersistJob> = Vec::with_capacity(batch_size);
        let flush_interval = config.flush_interval.max(MIN_FLUSH_INTERVAL);
        let start = tokio::time::Instant::now() + flush_interval;
        let mut ticker = tokio::time::interval_at(start, flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(Command::Job(job)) => {
                            {
                                let mut s = stats.write().await;
                                match job {
                                    PersistJob::Tick(_) => s.ticks_received += 1,
                                    PersistJob::Bar(..) => s.bars_received += 1,
                                }
                            }

                            buffer.push(job);
                            if buffer.len() >= batch_size {
                                Self::flush_buffer(&mut buffer, &store, &stats).await;
                            }
                        }
                        Some(Command::Flush(ack)) => {
                            Self::flush_buffer(&mut buffer, &store, &stats).await;
                            let _ = ack.send(());
                        }
                        None => {
                            Self::flush_buffer(&mut buffer, &store, &stats).await;
                            tracing::info!("Persistence writer shutting down");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    Self::flush_buffer(&mut buffer, &store, &stats).await;
                }
            }
        }
    }

    async fn flush_buffer(
        buffer: &mut Vec<PersistJob>,
        store: &PersistenceStore,
        stats: &Arc<RwLock<WriterStats>>,
    ) {
        if buffer.is_empty() {
            return;
        }

        let jobs = std::mem::take(buffer);
        let count = jobs.len() as u64;
        let store = store.clone();
        let result = tokio::task::spawn_blocking(move || store.write_batch(&jobs)).await;

        let mut s = stats.write().await;
        s.batches += 1;
        s.last_flush = Some(Utc::now());

        match result {
            Ok(Ok(outcome)) => {
                s.ticks_written += outcome.ticks_written;
                s.ticks_ignored += outcome.ticks_ignored;
                s.bars_written += outcome.bars_written;
                s.failed += outcome.failed;
                telemetry::record_persisted(
                    outcome.ticks_written + outcome.bars_written,
                    outcome.failed,
                );
                tracing::debug!(
                    ticks = outcome.ticks_written,
                    bars = outcome.bars_written,
                    failed = outcome.failed,
                    "Flushed persistence batch"
                );
            }
            Ok(Err(e)) => {
                s.failed += count;
                telemetry::record_persisted(0, count);
                tracing::error!(error = %e, count, "Failed to write persistence batch");
            }
            Err(e) => {
                s.failed += count;
                telemetry::record_persisted(0, count);
                tracing::error!(error = %e, count, "Persistence task panicked");
            }
        }
    }

    async fn send(&self, job: PersistJob) {
        if self.tx.send(Command::Job(job)).await.is_err() {
            telemetry::record_persisted(0, 1);
            tracing::error!("Persistence writer stopped, dropping write");
        }
    }

    /// Queue a tick for insert-if-absent
    pub async fn persist_tick(&self, tick: Tick) {
        self.send(PersistJob::Tick(tick)).await;
    }

    /// Queue a completed bar for insert-or-replace
    pub async fn persist_bar(&self, timeframe: Timeframe, bar: Bar) {
        self.send(PersistJob::Bar(timeframe, bar)).await;
    }

    /// Write everything queued so far and wait for it to reach storage.
    ///
    /// Returns false if the writer task is gone.
    pub async fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_err() {
            return false;
        }
        ack_rx.await.is_ok()
    }

    /// Get current statistics
    pub async fn stats(&self) -> WriterStats {
        self.stats.read().await.clone()
    }
}
