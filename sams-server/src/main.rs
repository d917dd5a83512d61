//! sams-server - School Attendance & Meal System service
//!
//! Bootstrap order: CLI/env, TOML file, compiled defaults. Recognition
//! settings live in the database and are edited at runtime.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sams_common::config::{default_config_path, load_toml_config, BootstrapConfig};
use sams_common::db::init_database;
use sams_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for sams-server
#[derive(Parser, Debug)]
#[command(name = "sams-server")]
#[command(about = "School attendance and meal recording service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SAMS_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "SAMS_DATABASE")]
    database: Option<PathBuf>,

    /// TOML config file (defaults to SAMS_CONFIG or the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load config file")?,
        None => None,
    };
    let config = BootstrapConfig::resolve(args.port, args.database, toml);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sams_server={0},sams_common={0},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting sams-server v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }
    info!("Database path: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

    let app = build_router(AppState::new(pool.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
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
            Ok(mut sig) => {
                sig.recv().await;
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
