//! foodreview REST API server

mod config;
mod routes;

use anyhow::{Context, Result};
use config::ServerConfig;
use core_pipeline::ReviewService;
use routes::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;

    // The model backend is built once here and shared by every request
    let client = llm_bridge::connect(&config.backend)?;
    let service = ReviewService::new(client, config.service);
    let state = Arc::new(AppState::new(service, config.max_concurrent_reviews));

    let app = routes::router(state);

    let addr = config.bind_addr();
    tracing::info!(
        max_attempts = config.service.max_attempts,
        max_concurrent_reviews = config.max_concurrent_reviews,
        "Server listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
