use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{NewProfile, Profile},
    routes::AppState,
};

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<NewProfile>,
) -> AppResult<(StatusCode, Json<Profile>)> {
    let created = state.profiles.create_profile(profile).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Profile>> {
    Ok(Json(state.profiles.get_profile(id).await?))
}
