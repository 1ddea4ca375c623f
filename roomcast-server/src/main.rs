//! Roomcast server - Main entry point
//!
//! Shared listening room: one audio source, one queue, many synchronized
//! listeners. Wires the playback scheduler, state broadcaster, and audio
//! fan-out together behind an axum HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomcast_common::config::{default_config_path, RoomConfig, SourceMode};
use roomcast_server::api;
use roomcast_server::audio::{capture, AudioFanout};
use roomcast_server::playback::PlaybackScheduler;
use roomcast_server::source::{LocalCatalogSource, RemotePlayerSource, SourceStrategy};
use roomcast_server::sse::StateBroadcaster;

/// Command-line source mode override
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Local,
    Remote,
}

impl From<ModeArg> for SourceMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => SourceMode::Local,
            ModeArg::Remote => SourceMode::Remote,
        }
    }
}

/// Command-line arguments for roomcast-server
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Shared listening room server")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "ROOMCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "ROOMCAST_PORT")]
    port: Option<u16>,

    /// Source mode (overrides config file)
    #[arg(short, long, env = "ROOMCAST_MODE")]
    mode: Option<ModeArg>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomcast_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments and resolve configuration
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(default_config_path);
    let mut config = RoomConfig::load(&config_path).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }

    info!(
        "Starting Roomcast on port {} ({} mode)",
        config.port, config.mode
    );

    // Wire the core: source adapter -> scheduler -> broadcaster, plus the
    // audio fan-out on its own channel.
    let strategy: Arc<dyn SourceStrategy> = match config.mode {
        SourceMode::Local => match &config.catalog_path {
            Some(path) => Arc::new(
                LocalCatalogSource::load(path).context("Failed to load track catalog")?,
            ),
            None => {
                warn!("No catalog_path configured; starting with an empty catalog");
                Arc::new(LocalCatalogSource::empty())
            }
        },
        SourceMode::Remote => Arc::new(RemotePlayerSource::new(config.remote_base_url.clone())),
    };

    let broadcaster = Arc::new(StateBroadcaster::new());
    let fanout = Arc::new(AudioFanout::new());
    let scheduler = PlaybackScheduler::new(Arc::clone(&strategy), Arc::clone(&broadcaster));

    // Remote mode mirrors the remote player's state on a poll loop
    if config.mode == SourceMode::Remote {
        let interval = Duration::from_millis(config.poll_interval_ms);
        tokio::spawn(Arc::clone(&scheduler).run_poll_loop(interval));
    }

    // One capture session feeds the audio channel for the process lifetime;
    // if it ends, listeners go silent until a restart.
    if let Some(command) = config.capture_command.clone() {
        let fanout = Arc::clone(&fanout);
        let capture_args = config.capture_args.clone();
        tokio::spawn(async move {
            if let Err(e) = capture::run_capture(fanout, &command, &capture_args).await {
                warn!("Capture session ended with error: {}", e);
            }
        });
    } else {
        info!("No capture_command configured; audio channel stays idle");
    }

    // Build the application router
    let app_state = api::AppState {
        scheduler,
        broadcaster,
        fanout,
        strategy,
        port: config.port,
    };
    let app = api::create_router(app_state, &config.static_dir);

    // Create and run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
