//! Sitewatch CLI
//!
//! Command-line interface for the construction project monitoring dashboard.

use std::path::PathBuf;

use clap::Parser;
use sitewatch::{load_config, probe, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "sitewatch")]
#[command(about = "Construction project monitoring dashboard")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Developer to load (overrides config file)
    #[arg(long)]
    developer_id: Option<String>,

    /// Status server port (overrides config file)
    #[arg(long)]
    status_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Check that the backend is reachable and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, developer_id={:?}, status_port={:?}, log_level={:?}",
        args.config,
        args.developer_id,
        args.status_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if args.check {
        let http = sitewatch::http_client(&config)?;
        let result = probe::check_backend(http.as_ref(), &config.api.base_url).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    config.resolve_secrets()?;

    if let Some(developer_id) = args.developer_id {
        config.dashboard.developer_id = Some(developer_id);
    }
    if let Some(status_port) = args.status_port {
        config.dashboard.status_server.port = status_port;
    }

    tracing::info!("Starting sitewatch against {}", config.api.base_url);

    sitewatch::run(config).await?;

    Ok(())
}
