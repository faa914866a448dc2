mod api_doc;
mod app;
mod auth;
mod config;
mod engine;
mod error;
mod handlers;
mod models;
mod routes;
mod sharing;
mod spanner;
mod state;
mod store;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use config::{Config, StoreBackend};
use spanner::SpannerClient;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("rust-spanner-mock starting");

    let config = Config::from_env()?;
    config.log_startup();

    let state = match config.backend {
        StoreBackend::Spanner => {
            let spanner_config = config
                .spanner
                .as_ref()
                .context("Spanner backend selected without Spanner settings")?;
            let client = Arc::new(SpannerClient::from_config(spanner_config).await?);
            AppState::new(client.clone(), client, config.clone())
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory route store; routes are lost on restart");
            AppState::in_memory(config.clone())
        }
    };

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app::build_router(state))
        .await
        .context("Server error")?;

    Ok(())
}
