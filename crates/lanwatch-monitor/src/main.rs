//! CLI entry point for the lanwatch presence monitor.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use lanwatch_monitor::api::{self, AppState};
use lanwatch_monitor::config::MonitorConfig;
use lanwatch_monitor::platform::{Platform, SystemPlatform};
use lanwatch_monitor::reconcile::LogAlertSink;

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(about = "LAN device presence monitor with whitelist enforcement")]
struct Cli {
    /// Config file prefix (default: lanwatch).
    #[arg(short, long, default_value = "lanwatch")]
    config: String,

    /// Override the API listen address, e.g. 127.0.0.1:3000.
    #[arg(short, long)]
    listen: Option<String>,

    /// Run a single discovery cycle, print the devices as JSON and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = load_monitor_config(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    let platform: Arc<dyn Platform> = Arc::new(SystemPlatform::new(config.command_timeout()));
    let state = AppState::build(&config, platform, Arc::new(LogAlertSink));

    if cli.once {
        let devices = state
            .scheduler
            .scan_now()
            .await
            .map_err(|e| anyhow::anyhow!("Discovery failed: {e}"))?;
        println!("{}", serde_json::to_string_pretty(devices.as_slice())?);
        return Ok(());
    }

    let scheduler = state.scheduler.clone();
    tokio::spawn(async move { scheduler.run().await });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        whitelist = %config.whitelist_path,
        "lanwatch API listening"
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("lanwatch stopped");
    Ok(())
}

fn load_monitor_config(file_prefix: &str) -> anyhow::Result<MonitorConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("LANWATCH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<MonitorConfig>("monitor") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(MonitorConfig::default()),
        Err(e) => Err(e.into()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
