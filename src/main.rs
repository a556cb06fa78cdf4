use tracing_subscriber::EnvFilter;

use cran_search::api;
use cran_search::config::Config;
use cran_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Snapshot endpoint: {}", config.snapshot.url);
    match &config.embedding {
        Some(embedding) => tracing::info!(
            "Semantic search: {} ({})",
            embedding.provider,
            embedding.base_url
        ),
        None => tracing::info!("Semantic search disabled"),
    }

    let state = AppState::new(&config)?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
