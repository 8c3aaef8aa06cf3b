//! Storage inspection commands

use crate::config::Config;
use crate::market::{format_timestamp, Timeframe};
use crate::store::PersistenceStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct TicksArgs {
    /// Symbol, e.g. btcusdt
    pub symbol: String,

    /// Number of ticks to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Print one JSON object per line
    #[arg(long)]
    pub json: bool,
}

impl TicksArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PersistenceStore::open(&config.storage.db_path)?;
        let symbol = self.symbol.to_lowercase();
        let ticks = store.recent_ticks(&symbol, self.limit)?;

        if ticks.is_empty() {
            println!("No ticks stored for {}", symbol);
            return Ok(());
        }

        for tick in &ticks {
            if self.json {
                println!("{}", serde_json::to_string(tick)?);
            } else {
                println!(
                    "{}  {:>14}  {:>14}",
                    format_timestamp(&tick.timestamp),
                    tick.price,
                    tick.size
                );
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct BarsArgs {
    /// Timeframe: 1s, 1m or 5m
    pub timeframe: Timeframe,

    /// Symbol, e.g. btcusdt
    pub symbol: String,

    /// Number of bars to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Print one JSON object per line
    #[arg(long)]
    pub json: bool,
}

impl BarsArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PersistenceStore::open(&config.storage.db_path)?;
        let symbol = self.symbol.to_lowercase();
        let bars = store.bars(self.timeframe, &symbol, self.limit)?;

        if bars.is_empty() {
            println!("No {} bars stored for {}", self.timeframe, symbol);
            return Ok(());
        }

        for bar in &bars {
            if self.json {
                println!("{}", serde_json::to_string(bar)?);
            } else {
                println!(
                    "{}  O {}  H {}  L {}  C {}  V {}",
                    format_timestamp(&bar.timestamp),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                );
            }
        }
        Ok(())
    }
}
