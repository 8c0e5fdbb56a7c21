//! BevGenie gateway process: config, stores, model client, HTTP server.

use bevgenie_core::{GenieConfig, OpenRouterClient, SledKnowledgeBase, SledSessionStore};
use bevgenie_gateway::{build_app, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(GenieConfig::load()?);
    if config.llm.api_key.is_empty() {
        tracing::warn!(
            target: "bevgenie::gateway",
            "no model API key configured; replies will use the fallback text and pages will fail"
        );
    }

    let db = sled::open(&config.server.storage_path)?;
    let sessions = Arc::new(SledSessionStore::with_db(db.clone())?);
    let client = Arc::new(OpenRouterClient::new(&config.llm));
    let knowledge = Arc::new(SledKnowledgeBase::new(
        &db,
        client.clone(),
        config.knowledge.min_similarity,
    )?);
    tracing::info!(
        target: "bevgenie::gateway",
        storage = %config.server.storage_path,
        documents = knowledge.len(),
        "stores opened"
    );

    let state = AppState::new(Arc::clone(&config), client, sessions, knowledge);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!(target: "bevgenie::gateway", addr = %config.server.bind_addr, "listening");

    axum::serve(listener, build_app(state)).await?;
    db.flush_async().await?;
    Ok(())
}
