use std::sync::Arc;
use std::time::Duration;

use cinelist_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, Datastore, MemoryStore, PgStore},
    routes::{create_router, AppState},
    services::providers::{CatalogProvider, HuggingFaceSimilarity, SimilarityProvider, TmdbCatalog},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often expired watch-history removals are committed
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Datastore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::new(create_pool(url).await?);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory datastore");
            Arc::new(MemoryStore::new())
        }
    };

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => match Cache::new(create_redis_client(url)?).await {
            Ok((cache, handle)) => (Some(cache), Some(handle)),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unreachable, catalog responses will not be cached");
                (None, None)
            }
        },
        None => {
            tracing::info!("REDIS_URL not set, catalog responses will not be cached");
            (None, None)
        }
    };

    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbCatalog::new(
        config.catalog_api_key.clone(),
        config.catalog_api_url.clone(),
        config.catalog_language.clone(),
        cache,
    ));

    let similarity: Option<Arc<dyn SimilarityProvider>> =
        config.similarity_api_key.clone().map(|api_key| {
            Arc::new(HuggingFaceSimilarity::new(
                api_key,
                config.similarity_api_url.clone(),
            )) as Arc<dyn SimilarityProvider>
        });
    if similarity.is_none() {
        tracing::warn!("SIMILARITY_API_KEY not set, AI ranking will use the heuristic fallback");
    }

    let state = AppState::new(&config, store.clone(), catalog, similarity);
    let sweeper = state.history.clone().spawn_sweeper(SWEEP_INTERVAL);

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        datastore = store.name(),
        language = %config.catalog_language,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
