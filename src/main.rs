use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

mod api;
mod config;
mod db;
mod error;
mod models;
mod services;

use api::AppState;
use config::Config;
use db::Repository;
use services::{SongDetailsClient, SongService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("failed to load configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let repository = Repository::new(&config.db_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path))?;
    tracing::info!("Connected to database {}", config.db_path);

    if let Some(dir) = &config.migrations_dir {
        db::migrations::run(&repository, dir)
            .await
            .context("failed to apply migrations")?;
    }

    let details = SongDetailsClient::new(&config.api_url, config.request_timeout())
        .context("failed to build song details client")?;
    let songs = Arc::new(SongService::new(repository, Arc::new(details)));

    let app = api::router(AppState {
        songs,
        strict_updates: config.strict_updates,
    });

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
