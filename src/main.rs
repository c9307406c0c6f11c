use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use nl_query_backend::api;
use nl_query_backend::config::Config;
use nl_query_backend::services::{create_adapter, LlmClient, OllamaClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting server on {}", config.server_address());

    let db = create_adapter(&config.database);
    let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(&config.llm));

    if llm.is_available().await {
        info!("LLM service reachable at {} (model {})", config.llm.base_url, config.llm.model);
    } else {
        warn!(
            "LLM service not reachable at {}; natural language queries will fail until it is",
            config.llm.base_url
        );
    }

    // Create router with state
    let state = api::AppState::new(config.clone(), db, llm);
    let app = api::create_router(state);

    // Start server
    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
