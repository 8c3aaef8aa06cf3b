//! CLI interface for tick-bars
//!
//! Provides subcommands for:
//! - `run`: Stream trades and build bars until Ctrl-C
//! - `ticks`: Show stored ticks for a symbol
//! - `bars`: Show stored bars for a timeframe and symbol
//! - `config`: Show the effective configuration

mod inspect;
mod run;

pub use inspect::{BarsArgs, TicksArgs};
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tick-bars")]
#[command(about = "Live trade ingestion with multi-timeframe OHLCV bars")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream trades, build bars and persist both
    Run(RunArgs),
    /// Show the most recent stored ticks
    Ticks(TicksArgs),
    /// Show the most recent stored bars
    Bars(BarsArgs),
    /// Show configuration
    Config,
}
