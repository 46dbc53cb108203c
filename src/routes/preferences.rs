use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{GenreStat, UserSettings},
    routes::AppState,
};

/// Re-analyzes the watch history and returns genre shares, largest first
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<GenreStat>>> {
    Ok(Json(state.preferences.analyze(user_id).await?))
}

pub async fn settings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserSettings>> {
    Ok(Json(state.preferences.settings(user_id).await?))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(settings): Json<UserSettings>,
) -> AppResult<Json<UserSettings>> {
    Ok(Json(
        state.preferences.update_settings(user_id, settings).await?,
    ))
}
