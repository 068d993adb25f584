//! Campus Sentinel Server
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! Settings are read from `--config`, or the first of
//! `~/.config/campus-sentinel/config.toml`, `/etc/campus-sentinel/config.toml`
//! and `./config.toml`. Environment variables override the file:
//! - `SENTINEL_HOST`: Host to bind to (default: 0.0.0.0)
//! - `SENTINEL_PORT`: Port to listen on (default: 8090)
//! - `SENTINEL_KEEP_ALIVE_SECS`: SSE keep-alive interval (default: 15)
//! - `SENTINEL_DETECTOR_URL`: Detection service URL (default: http://localhost:8000)
//! - `SENTINEL_DETECTOR_API_KEY`: Bearer token for the detection service
//! - `SENTINEL_LOG_LEVEL`: Log level (default: info)
//! - `SENTINEL_LOG_FORMAT`: `pretty` or `json` (default: pretty)
//! - `RUST_LOG`: Full tracing filter, takes precedence over the log level

use anyhow::Context;
use campus_sentinel::api::{serve, AppState};
use campus_sentinel::config::{self, Config, LoggingConfig};
use campus_sentinel::detection::{Detector, DetectorClient};
use campus_sentinel::realtime::EventHub;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "campus-sentinel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Realtime anomaly alerts for campus camera dashboards")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the alert server (default)
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            let mut config = match &cli.config {
                Some(path) => Config::load_with_env(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => Config::load_default(),
            };
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            init_tracing(&config.logging);
            run(config).await?;
        }

        Commands::Config { output } => {
            let config = config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Campus Sentinel v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        keep_alive_secs = config.realtime.keep_alive_secs,
        channel_capacity = config.realtime.channel_capacity,
        max_channels_per_user = config.realtime.max_channels_per_user,
        "Alert stream settings"
    );

    let detector = DetectorClient::new(config.detector.clone())
        .context("Failed to build detection service client")?;

    match detector.health_check().await {
        Ok(()) => tracing::info!("Detection service reachable at {}", config.detector.base_url),
        Err(e) => tracing::warn!(
            "Detection service not available: {} (frames will get fallback results)",
            e
        ),
    }

    let state = AppState::new(config, EventHub::new(), Arc::new(detector));
    serve(state).await?;

    tracing::info!("Campus Sentinel stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "campus_sentinel={level},tower_http={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
