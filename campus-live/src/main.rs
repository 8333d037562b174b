//! campus-live - live occupancy service
//!
//! Accepts occupancy telemetry over HTTP, reconciles it against each
//! space's calendar and streams the resulting updates to dashboards.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use campus_common::config::{resolve_config_path, CampusConfig};
use campus_common::db::{init_database, provision_spaces};
use campus_common::events::EventBus;
use campus_live::reconciler::ReconcilerSettings;
use campus_live::{build_router, calendar, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for campus-live
#[derive(Parser, Debug)]
#[command(name = "campus-live")]
#[command(about = "Live occupancy service for campus spaces")]
#[command(version)]
struct Args {
    /// Bootstrap config file (falls back to CAMPUS_CONFIG, then platform locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long, env = "CAMPUS_DATABASE")]
    database: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5750
    #[arg(short, long, env = "CAMPUS_BIND_ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config =
        CampusConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("campus_live={level},campus_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting campus-live v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    provision_spaces(&pool, &config.spaces)
        .await
        .context("Failed to provision spaces")?;

    let provider = calendar::from_config(&config).context("Failed to build calendar provider")?;
    info!("Calendar provider: {}", provider.name());

    let settings = ReconcilerSettings::from_config(&config).context("Invalid reconciler settings")?;
    info!(
        "History policy: {:?}, calendar timeout: {:?}",
        settings.history_policy, settings.calendar_timeout
    );

    let bus = Arc::new(EventBus::new(config.events.capacity));
    info!("Event bus capacity: {} per subscriber", bus.capacity());
    let state = AppState::new(pool, provider, bus, settings);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("campus-live listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

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
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
