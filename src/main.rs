use clap::Parser;
use tick_bars::cli::{Cli, Commands};
use tick_bars::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Warning: Config file {} not found", cli.config);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example"))?
    };

    // Initialize telemetry
    tick_bars::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(symbols = ?config.stream.symbols, "Starting stream ingestion");
            args.execute(&config).await?;
        }
        Commands::Ticks(args) => args.execute(&config)?,
        Commands::Bars(args) => args.execute(&config)?,
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Stream: {} ({}) {}",
                config.stream.base_url,
                config.stream.stream_type,
                config.stream.symbols.join(",")
            );
            println!("  Storage: {}", config.storage.db_path.display());
            println!(
                "  Buffers: ticks={} 1s={} 1m={} 5m={}",
                config.buffers.tick_capacity,
                config.buffers.bars_1s,
                config.buffers.bars_1m,
                config.buffers.bars_5m
            );
            match config.telemetry.metrics_port {
                Some(port) => println!("  Metrics: :{}", port),
                None => println!("  Metrics: disabled"),
            }
        }
    }

    Ok(())
}
