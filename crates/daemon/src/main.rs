use clap::{Parser, Subcommand};
use tracing::{info, Level};

mod config;
mod diagnostics;
mod discovery;

use config::DaemonConfig;

#[derive(Parser)]
#[command(name = "blewatchd")]
#[command(about = "BLE device discovery daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Seconds between poll cycles
    #[arg(long, default_value = "60")]
    scan_interval: u64,

    /// Gateway topic announced at startup (legacy MQTT plumbing)
    #[arg(long, default_value = "BTLE")]
    gateway_topic: String,

    /// Registry file path (defaults to the platform data dir)
    #[arg(long)]
    discoveries_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the discovery poll loop
    Run,
    /// Trigger a single manual scan and report the results
    Scan,
    /// Collect and print system diagnostics
    Diagnostics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let config = DaemonConfig::new(cli.scan_interval, cli.gateway_topic, cli.discoveries_file);

    match cli.command {
        Some(Commands::Run) | None => run_daemon(config).await?,
        Some(Commands::Scan) => {
            let ctx = discovery::Context::new(&config);
            ctx.manual_scan().await;
        }
        Some(Commands::Diagnostics) => {
            let report = diagnostics::collect().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn run_daemon(config: DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("🔍 BLE discovery daemon");
    info!("   registry: {}", config.discoveries_file.display());
    info!("   scan interval: {}s", config.scan_interval.as_secs());
    info!("   gateway topic: {}", config.gateway_topic);

    let report = diagnostics::collect().await;
    match diagnostics::persist(&config, &report).await {
        Ok(path) => info!("diagnostics saved to {}", path.display()),
        Err(e) => tracing::warn!("failed to persist diagnostics: {}", e),
    }
    info!(
        "platform {}/{}, bluetoothctl available: {}, {} adapters",
        report.platform,
        report.arch,
        report.bluetoothctl_available,
        report.bluetooth_adapters.len()
    );

    let ctx = discovery::Context::new(&config);
    ctx.bootstrap().await;

    // Nothing inside a cycle is allowed to kill the daemon: every
    // failure is logged and the loop proceeds to the next sleep.
    let loop_ctx = ctx.clone();
    let interval = config.scan_interval;
    tokio::spawn(async move {
        loop {
            let total = loop_ctx.run_cycle(false).await;
            info!("scan cycle complete, {} devices known", total);
            tokio::time::sleep(interval).await;
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("🛑 shutting down");

    Ok(())
}
