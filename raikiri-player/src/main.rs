//! Raikiri player - Main entry point
//!
//! Runs the playback controller for a Raikiri media server and exposes the
//! control API, element event endpoint and SSE stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use raikiri_common::config::resolve_value;
use raikiri_common::events::SinkKind;
use raikiri_common::LibraryMode;
use raikiri_player::api::{self, AppContext};
use raikiri_player::backend::{HttpBackend, MediaBackend};
use raikiri_player::config::{PlayerConfig, DEFAULT_BIND_ADDR, DEFAULT_SERVER_URL};
use raikiri_player::media_session::{platform_now_playing, MediaSessionAdapter};
use raikiri_player::playback::{PlaybackController, RemoteSink};
use raikiri_player::state::SharedState;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for raikiri-player
///
/// `--server-url`, `--bind-addr` and `--library-mode` fall back to
/// `RAIKIRI_SERVER_URL`, `RAIKIRI_BIND_ADDR` and `RAIKIRI_LIBRARY_MODE`, then
/// to the config file.
#[derive(Parser, Debug)]
#[command(name = "raikiri-player")]
#[command(about = "Playback controller for the Raikiri media server")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/raikiri/player.toml)
    #[arg(short, long, env = "RAIKIRI_PLAYER_CONFIG")]
    config: Option<PathBuf>,

    /// Media server base URL
    #[arg(short, long)]
    server_url: Option<String>,

    /// Control API listen address
    #[arg(short, long)]
    bind_addr: Option<String>,

    /// Library to play from (files or music)
    #[arg(short = 'm', long)]
    library_mode: Option<LibraryMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raikiri_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.server_url = resolve_value(
        args.server_url,
        "RAIKIRI_SERVER_URL",
        Some(config.server_url),
        DEFAULT_SERVER_URL.to_string(),
    );
    config.bind_addr = resolve_value(
        args.bind_addr,
        "RAIKIRI_BIND_ADDR",
        Some(config.bind_addr),
        DEFAULT_BIND_ADDR.to_string(),
    );
    config.library_mode = resolve_value(
        args.library_mode,
        "RAIKIRI_LIBRARY_MODE",
        Some(config.library_mode),
        LibraryMode::default(),
    );
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting Raikiri player (server {}, library {})",
        config.server_url,
        config.library_mode.as_str()
    );

    let backend: Arc<dyn MediaBackend> = Arc::new(
        HttpBackend::new(&config.server_url).context("Failed to create media server client")?,
    );
    let state = Arc::new(SharedState::new(config.event_capacity));

    let audio = RemoteSink::new(SinkKind::Audio, state.event_bus().clone());
    let video = RemoteSink::new(SinkKind::Video, state.event_bus().clone());
    let (controller, controller_task) = PlaybackController::spawn(
        config.clone(),
        Arc::clone(&backend),
        Arc::clone(&state),
        Box::new(audio),
        Box::new(video),
    );
    info!("Playback controller initialized");

    if config.media_controls {
        if let Err(e) = MediaSessionAdapter::spawn(
            platform_now_playing,
            state.subscribe_events(),
            controller.clone(),
        ) {
            warn!("Failed to start now-playing integration: {}", e);
        }
    }

    let ctx = AppContext {
        state: Arc::clone(&state),
        controller: controller.clone(),
        backend,
        library_mode: config.library_mode,
    };
    api::run(ctx, &config.bind_addr, shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Close any live stream session before exiting
    controller
        .shutdown()
        .await
        .context("Playback controller stopped unexpectedly")?;
    if let Err(e) = controller_task.await {
        error!("Playback controller task failed: {}", e);
    }

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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
