use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    db::Datastore,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{
        providers::{CatalogProvider, SimilarityProvider},
        PreferenceService, ProfileService, RankingOptions, RecommendationService,
        SimilarityRanker, WatchHistory,
    },
};

pub mod catalog;
pub mod preferences;
pub mod profiles;
pub mod recommendations;
pub mod watched;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub history: Arc<WatchHistory>,
    pub preferences: PreferenceService,
    pub profiles: ProfileService,
    pub recommender: RecommendationService,
}

impl AppState {
    /// Wires the services over the given backends.
    ///
    /// Without a similarity provider every AI request is served by the
    /// heuristic fallback.
    pub fn new(
        config: &Config,
        store: Arc<dyn Datastore>,
        catalog: Arc<dyn CatalogProvider>,
        similarity: Option<Arc<dyn SimilarityProvider>>,
    ) -> Arc<Self> {
        let history = Arc::new(WatchHistory::new(
            store.clone(),
            catalog.clone(),
            chrono::Duration::seconds(config.undo_window_secs as i64),
        ));

        let ranker = similarity.map(|provider| {
            SimilarityRanker::new(
                provider,
                config.similarity_concurrency,
                std::time::Duration::from_millis(config.similarity_timeout_ms),
                config.similarity_threshold,
            )
        });

        let recommender = RecommendationService::new(
            store.clone(),
            catalog.clone(),
            history.clone(),
            ranker,
            RankingOptions::from_config(config),
        );

        Arc::new(Self {
            preferences: PreferenceService::new(store.clone(), history.clone()),
            profiles: ProfileService::new(store.clone()),
            store,
            catalog,
            history,
            recommender,
        })
    }
}

/// Creates the application router with all routes.
///
/// The request id is assigned before the trace span is opened so every
/// log line of a request carries it.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog/:media/popular", get(catalog::popular))
        .route("/catalog/:media/top_rated", get(catalog::top_rated))
        .route("/catalog/:media/:id", get(catalog::details))
        .route("/search", get(catalog::search))
        .route("/profiles", post(profiles::create))
        .route("/profiles/:id", get(profiles::get))
        .route("/users/:user_id/watched", get(watched::list).post(watched::mark))
        .route(
            "/users/:user_id/watched/:media/:content_id",
            delete(watched::remove),
        )
        .route(
            "/users/:user_id/watched/:media/:content_id/undo",
            post(watched::undo),
        )
        .route("/users/:user_id/preferences", get(preferences::analyze))
        .route(
            "/users/:user_id/settings",
            get(preferences::settings).put(preferences::update_settings),
        )
        .route(
            "/users/:user_id/recommendations/:media",
            get(recommendations::recommend),
        )
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "datastore": state.store.name(),
            "catalog": state.catalog.name(),
            "ai_available": state.recommender.ai_available(),
        })),
    )
}
