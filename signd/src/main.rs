//! signd - Main entry point
//!
//! Boots the signage daemon: resolve configuration, start playback over
//! whatever the catalog already holds, then serve the REST API until a
//! shutdown signal arrives.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signd::api::{self, AppContext};
use signd::config::{Config, ConfigOverrides};
use signd::engine::SignageEngine;
use signd::status::StatusReporter;

/// Command-line arguments for signd
#[derive(Parser, Debug)]
#[command(name = "signd")]
#[command(about = "Digital signage playback daemon")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SIGND_PORT")]
    port: Option<u16>,

    /// Root folder for videos, catalog and playlist
    #[arg(short, long, env = "SIGND_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, env = "SIGND_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Resolve configuration (CLI/env over TOML over defaults)
    let config = Config::load(
        args.config.as_deref(),
        ConfigOverrides {
            port: args.port,
            root_folder: args.root_folder,
        },
    )
    .context("Failed to load configuration")?;

    // Initialize tracing
    let default_filter = format!("signd={},tower_http=debug", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting signd on port {}", config.port);
    info!("Root folder: {}", config.root_folder.display());

    config
        .ensure_dirs()
        .context("Failed to create data directories")?;

    // Build the engine and status reporter
    let engine = Arc::new(SignageEngine::new(&config));
    let status = Arc::new(StatusReporter::new(engine.clone()));

    // Start playback over whatever the catalog already holds
    if engine.restart_playback().await {
        info!("Playback started");
    } else {
        info!("No playable assets; player stopped");
    }

    // Build the application router
    let app = api::build_router(AppContext {
        engine: engine.clone(),
        status,
    });

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Leave the screen dark rather than orphaning the player
    engine.shutdown().await;

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
