//! Run command implementation

use crate::config::Config;
use crate::coordinator::StreamCoordinator;
use crate::store::PersistenceStore;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between status log lines
    #[arg(long, default_value_t = 30)]
    pub status_interval: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PersistenceStore::open(&config.storage.db_path)?;
        tracing::info!(db_path = %config.storage.db_path.display(), "Opened store");

        let coordinator = StreamCoordinator::new(config.coordinator_config(), store);
        coordinator.start();

        let mut status = tokio::time::interval(Duration::from_secs(self.status_interval.max(1)));
        status.tick().await;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    tracing::info!("Shutdown requested");
                    break;
                }
                _ = status.tick() => {
                    log_status(&coordinator).await;
                }
            }
        }

        coordinator.shutdown().await;
        let stats = coordinator.writer().stats().await;
        tracing::info!(
            ticks_written = stats.ticks_written,
            ticks_ignored = stats.ticks_ignored,
            bars_written = stats.bars_written,
            failed = stats.failed,
            "Stopped"
        );
        Ok(())
    }
}

async fn log_status(coordinator: &StreamCoordinator) {
    let mut prices = Vec::with_capacity(coordinator.symbols().len());
    for symbol in coordinator.symbols() {
        prices.push(format!("{}={}", symbol, coordinator.latest_price(symbol).await));
    }
    let stats = coordinator.writer().stats().await;

    tracing::info!(
        running = coordinator.is_running(),
        prices = %prices.join(" "),
        ticks_written = stats.ticks_written,
        ticks_ignored = stats.ticks_ignored,
        bars_written = stats.bars_written,
        failed = stats.failed,
        "Status"
    );
}
