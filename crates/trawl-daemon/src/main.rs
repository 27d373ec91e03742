//! Trawl Daemon
//!
//! Long-running HTTP server exposing the downloads listing and full-corpus
//! search endpoint in front of a paginated upstream record store.

use std::path::PathBuf;

use clap::Parser;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use trawl_daemon::{AppState, Result, TrawlConfig, serve};

/// Downloads listing proxy with full-corpus fuzzy search.
#[derive(Debug, Parser)]
#[command(name = "trawl-daemon", version, about)]
struct Args {
    /// Path to the configuration file (default: ~/.config/trawl/config.toml)
    #[arg(short, long, env = "TRAWL_CONFIG")]
    config: Option<PathBuf>,
}

/// Initializes structured logging with tracing.
///
/// Supports two output formats via `TRAWL_LOG_FORMAT` environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via `RUST_LOG` environment variable.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("TRAWL_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trawl_daemon=info,trawl=info,trawl_client=info"));

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();

    info!("Starting trawl daemon");

    let config = match TrawlConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            if args.config.is_none() {
                error!("Expected config at: {:?}", TrawlConfig::config_path());
            }
            return Err(e);
        }
    };

    info!(
        "Proxying {} (page size {}, record cap {:?})",
        config.upstream.base_url,
        config.search.page_size,
        config.search.record_cap()
    );

    let state = AppState::from_config(&config)?;
    let listener = TcpListener::bind(config.server.bind_addr()).await?;

    // Create shutdown channel
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    // Set up signal handlers
    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    let handle = signals.handle();
    tokio::spawn(async move {
        use futures::stream::StreamExt;
        while let Some(signal) = signals.next().await {
            match signal {
                SIGTERM => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    let _ = shutdown_tx.send(());
                    break;
                }
                SIGINT => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    let _ = shutdown_tx.send(());
                    break;
                }
                _ => {}
            }
        }
    });

    info!("Daemon ready");

    serve(listener, state, async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    handle.close();
    info!("Daemon shutdown complete");

    Ok(())
}
