//! Board service (huddle-board) - Main entry point
//!
//! Serves the Huddle Up board API: board/event/transaction/suggestion data,
//! timeline layout, change notifications over SSE, and voice coach exchanges.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huddle_board::api::{self, AppState};
use huddle_board::coach::CoachClient;
use huddle_board::config::Config;
use huddle_board::db::{init_database, Store};
use huddle_board::state::SharedState;
use huddle_board::timeline::LayoutParams;
use huddle_common::config::SavingsPolicy;

/// Command-line arguments for huddle-board
#[derive(Parser, Debug)]
#[command(name = "huddle-board")]
#[command(about = "Board service for Huddle Up")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "HUDDLE_PORT")]
    port: u16,

    /// Path to the SQLite database
    #[arg(short, long, default_value = "huddle.db", env = "HUDDLE_DB")]
    db_path: PathBuf,

    /// Base URL of the coaching backend
    #[arg(short, long, default_value = "http://localhost:8080", env = "HUDDLE_COACH_URL")]
    coach_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle_board=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();
    let config = Config {
        db_path: args.db_path,
        bind_addr: format!("0.0.0.0:{}", args.port),
        coach_url: args.coach_url,
    };

    info!("Starting Huddle Up board service on {}", config.bind_addr);
    info!("Database: {}", config.db_path.display());
    info!("Coaching backend: {}", config.coach_url);

    // Initialize database and store
    let pool = init_database(&config.db_path)
        .await
        .context("Failed to initialize database")?;
    let store = Store::new(pool);
    info!("Data store initialized");

    // Build the application router
    let app_state = AppState {
        store,
        shared: Arc::new(SharedState::new()),
        coach: Arc::new(CoachClient::new(config.coach_url)),
        policy: SavingsPolicy::default(),
        layout: LayoutParams::default(),
        port: args.port,
    };

    let app = api::create_router(app_state);

    // Create socket address
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .context("Invalid bind address")?;

    info!("Starting HTTP server on {}", addr);

    // Create and run the server
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
