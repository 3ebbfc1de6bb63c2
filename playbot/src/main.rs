//! Playbot - Main entry point
//!
//! Loads configuration and playlists, wires the yt-dlp resolver and ffmpeg
//! transport into the session registry, and serves the HTTP command API
//! until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playbot::api::{self, AppContext};
use playbot::config::{Config, Overrides};
use playbot::playback::SessionRegistry;
use playbot::playlist::PlaylistStore;
use playbot::resolver::{TrackResolver, YtDlpResolver};
use playbot::transport::FfmpegTransportFactory;
use playbot::{CommandService, SharedState};

/// Command-line arguments for playbot
#[derive(Parser, Debug)]
#[command(name = "playbot")]
#[command(about = "Multi-session audio playback coordinator")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "PLAYBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PLAYBOT_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "PLAYBOT_BIND")]
    bind: Option<String>,

    /// Directory holding playlist JSON files
    #[arg(long, env = "PLAYBOT_PLAYLISTS_DIR")]
    playlists_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "PLAYBOT_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(
        args.config.as_deref(),
        Overrides {
            port: args.port,
            bind: args.bind,
            playlists_dir: args.playlists_dir,
            log_level: args.log_level,
        },
    )
    .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting playbot v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    info!("Playlists directory: {}", config.storage.playlists_dir.display());
    info!(
        "Resolver: {}, transport: {}",
        config.resolver.program.display(),
        config.transport.program.display()
    );

    let state = Arc::new(SharedState::new());

    let playlists = Arc::new(
        PlaylistStore::load(config.storage.playlists_dir.clone(), Arc::clone(&state))
            .await
            .context("Failed to load playlists")?,
    );

    let resolver: Arc<dyn TrackResolver> = Arc::new(YtDlpResolver::new(&config.resolver));
    let transports = Arc::new(FfmpegTransportFactory::new(config.transport.clone()));

    let registry = Arc::new(SessionRegistry::new(
        Arc::clone(&resolver),
        transports,
        Arc::clone(&state),
        config.playback.clone(),
    ));

    let commands = Arc::new(CommandService::new(
        Arc::clone(&registry),
        playlists,
        resolver,
        config.playback.clone(),
    ));

    let ctx = AppContext {
        commands,
        state,
    };

    let served = api::run(&config.server, ctx, shutdown_signal()).await;

    // Stop every transport even if the server failed
    registry.shutdown_all().await;

    served.context("HTTP server failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
