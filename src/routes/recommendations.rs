use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::MediaType,
    routes::AppState,
    services::Recommendations,
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((user_id, media_type)): Path<(Uuid, MediaType)>,
) -> AppResult<Json<Recommendations>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        media_type = %media_type,
        "Processing recommendation request"
    );

    let recommendations = state.recommender.recommend(user_id, media_type).await?;

    tracing::info!(
        request_id = %request_id,
        strategy = ?recommendations.strategy,
        count = recommendations.items.len(),
        "Recommendation request completed"
    );

    Ok(Json(recommendations))
}
