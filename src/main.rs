use std::sync::Arc;

use cinematch::{
    config::Config,
    routes::{create_router, AppState},
    services::{InMemoryRatingStore, MovieCatalog, RatingStore, RecommendationService},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinematch=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn RatingStore> = Arc::new(InMemoryRatingStore::from_config(&config).await?);
    let loaded = store.len().await?;

    let service = Arc::new(RecommendationService::new(store, config.engine())?);

    if loaded > 0 {
        if let Err(e) = service.retrain().await {
            tracing::warn!(error = %e, "Initial training failed, serving 503 until retrained");
        }
    } else {
        tracing::warn!("No ratings loaded, POST /api/v1/ratings then /api/v1/model/train");
    }

    let mut state = AppState::new(service, config.default_top_n);
    match &config.movies_path {
        Some(path) => {
            let catalog = MovieCatalog::from_json_file(path).await?;
            state = state.with_catalog(Arc::new(catalog));
        }
        None => tracing::warn!("No MOVIES_PATH set, catalog endpoints will answer 503"),
    }
    let state = Arc::new(state);
    let app = create_router(state);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
