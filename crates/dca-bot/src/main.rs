//! DCA order-ladder bot - Entry Point

use anyhow::Result;
use clap::Parser;
use dca_core::DirectionalState;
use tracing::info;

/// DCA order-ladder bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DCA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Run one cycle with this state (e.g. VERY_LONG) and print the report
    #[arg(long, value_name = "STATE")]
    once: Option<DirectionalState>,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    dump_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > DCA_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DCA_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config = dca_bot::AppConfig::load(&config_path)?;
    config.telemetry.dump_metrics |= args.dump_metrics;

    dca_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting DCA bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        symbol = %config.market.symbol,
        trigger_mode = %config.scheduler.trigger_mode,
        "Configuration loaded"
    );

    let dump_metrics = config.telemetry.dump_metrics;
    let app = dca_bot::Application::new(config)?;

    match args.once {
        Some(state) => {
            let report = app.run_once(state).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if dump_metrics {
                println!("{}", dca_telemetry::Metrics::render()?);
            }
        }
        None => app.run().await?,
    }

    Ok(())
}
