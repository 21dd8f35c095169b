use axum::routing::get;
use axum::{Json, Router};
use tracing_subscriber::EnvFilter;

use arxiv_research::api;
use arxiv_research::config::Config;
use arxiv_research::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!("arXiv endpoint: {}", config.search.base_url);

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/", get(root))
        .route("/ws/research", get(api::ws::research_ws))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "arXiv research system API" }))
}
