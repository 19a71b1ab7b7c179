//! Crowdfunding API - Main Application Entry Point
//!
//! A REST API server for a crowdfunding platform: users register and log
//! in, create campaigns, and donate to other people's campaigns. The same
//! binary carries the operational commands (migrations, reconciliation of
//! campaign totals, connectivity checks).
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: JWT bearer tokens, argon2 password hashes
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow (`serve`)
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the periodic reconciler
//! 5. Build HTTP router with routes and middleware
//! 6. Serve on the configured port until SIGINT/SIGTERM

mod app;
mod cli;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod ops;
mod services;
mod state;
#[cfg(test)]
mod test_support;
mod validation;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Command},
    config::Config,
    services::reconciliation_service,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_filter().into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => ops::migrate(&config).await,
        Command::Reconcile(cmd) => ops::reconcile(&config, &cmd).await,
        Command::Check(cmd) => ops::check(&config, &cmd).await,
        Command::PromoteAdmin(cmd) => ops::promote_admin(&config, &cmd).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if !config.auth_enabled {
        tracing::warn!(
            "AUTH_ENABLED=false: token signatures and expiry are NOT checked, do not run this in production"
        );
    }

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let reconciler = (config.reconcile_interval_secs > 0).then(|| {
        tracing::info!(
            every_secs = config.reconcile_interval_secs,
            "Periodic reconciliation enabled"
        );
        tokio::spawn(reconciliation_service::run_periodic(
            pool.clone(),
            Duration::from_secs(config.reconcile_interval_secs),
        ))
    });

    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = app::build_router(AppState::new(pool, config))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = reconciler {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
