use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{MediaType, WatchedItem},
    routes::AppState,
    services::WatchState,
};

#[derive(Debug, Deserialize)]
pub struct MarkWatchedRequest {
    pub media_type: MediaType,
    pub content_id: i64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<WatchedItem>>> {
    Ok(Json(state.history.list_watched(user_id).await?))
}

pub async fn mark(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<MarkWatchedRequest>,
) -> AppResult<(StatusCode, Json<WatchedItem>)> {
    let item = state
        .history
        .mark_watched(user_id, request.media_type, request.content_id)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Starts the undo window; the row is deleted once it closes
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((user_id, media_type, content_id)): Path<(Uuid, MediaType, i64)>,
) -> AppResult<(StatusCode, Json<WatchState>)> {
    let expires_at = state
        .history
        .remove_watched(user_id, media_type, content_id)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        content_id,
        "Removal accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(WatchState::PendingDelete { expires_at }),
    ))
}

pub async fn undo(
    State(state): State<Arc<AppState>>,
    Path((user_id, media_type, content_id)): Path<(Uuid, MediaType, i64)>,
) -> AppResult<Json<WatchState>> {
    let restored = state
        .history
        .undo_remove(user_id, media_type, content_id)
        .await?;
    Ok(Json(restored))
}
