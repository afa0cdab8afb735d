use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use encore_api::api::{create_router, AppState};
use encore_api::cache::CacheStore;
use encore_api::config::Config;
use encore_api::db::{self, PgCatalogRepository, PgHistoryRecorder};
use encore_api::services::{
    Enricher, HttpInferenceClient, ItunesMetadataProvider, MediaStager, RecommendationService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!().run(&pool).await?;

    if config.ai_server_url.is_none() {
        tracing::warn!("AI_SERVER_URL is not set, recommendation requests will fail fast");
    }

    // Compose the pipeline: collaborators constructed once, passed explicitly
    let cache = Arc::new(CacheStore::new(Duration::from_secs(
        config.metadata_cache_ttl_secs,
    )));
    let metadata = Arc::new(ItunesMetadataProvider::new(
        config.metadata_search_url.clone(),
        cache,
    ));
    let catalog = Arc::new(PgCatalogRepository::new(pool.clone()));
    let history = Arc::new(PgHistoryRecorder::new(pool));
    let inference = Arc::new(HttpInferenceClient::new(
        config.ai_server_url.clone(),
        Duration::from_secs(config.inference_local_timeout_secs),
        Duration::from_secs(config.inference_remote_timeout_secs),
    ));
    let stager = MediaStager::new(config.media_dir.clone().into(), config.max_window_sec);
    let enricher = Enricher::new(catalog, metadata);
    let recommender = Arc::new(RecommendationService::new(
        stager,
        inference,
        enricher,
        history,
        config.max_window_sec,
        config.top_k_max,
    ));

    let state = AppState::new(recommender, config.media_dir.clone().into());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
