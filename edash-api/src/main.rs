//! edash-api - Employee efficiency dashboard service
//!
//! Serves upload ingestion (preview + confirm), dashboard aggregates and
//! reference-data CRUD over a SQLite database in the root folder.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use edash_api::{build_router, AppState, ServiceSettings};
use edash_common::config::{database_path, resolve_root_folder, TomlConfig};
use edash_common::db::init_database;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for edash-api
#[derive(Parser, Debug)]
#[command(name = "edash-api")]
#[command(about = "Employee efficiency dashboard backend")]
#[command(version)]
struct Args {
    /// Configuration file (overrides EDASH_CONFIG and the user config file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder holding the database and temporary uploads
    #[arg(short, long, env = "EDASH_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides [server].port)
    #[arg(short, long, env = "EDASH_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing exists: its level seeds the filter
    let config = TomlConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", config.logging.level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting edash-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = database_path(&root_folder);
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("Database ready: {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let settings = ServiceSettings::from_config(&config, &root_folder);
    if settings.shared_secret == 0 {
        warn!("Caller hash verification disabled (auth.shared_secret = 0)");
    }
    info!(
        parse_mode = ?settings.parse_mode,
        temp_dir = %settings.temp_dir.display(),
        "Ingestion settings"
    );

    let app = build_router(AppState::new(pool, settings));

    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("edash-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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
