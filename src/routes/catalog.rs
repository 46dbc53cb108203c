use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{CandidateContent, CastMember, MediaType, TitleDetails, Trailer},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Title detail page payload
#[derive(Debug, Serialize)]
pub struct TitleDetailResponse {
    #[serde(flatten)]
    pub details: TitleDetails,
    pub cast: Vec<CastMember>,
    pub trailers: Vec<Trailer>,
}

pub async fn popular(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<MediaType>,
) -> AppResult<Json<Vec<CandidateContent>>> {
    Ok(Json(state.catalog.popular(media_type).await?))
}

pub async fn top_rated(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<MediaType>,
) -> AppResult<Json<Vec<CandidateContent>>> {
    Ok(Json(state.catalog.top_rated(media_type).await?))
}

/// Details, cast and trailers fetched together
pub async fn details(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(MediaType, i64)>,
) -> AppResult<Json<TitleDetailResponse>> {
    let (details, cast, trailers) = tokio::try_join!(
        state.catalog.details(media_type, id),
        state.catalog.credits(media_type, id),
        state.catalog.trailers(media_type, id),
    )?;

    Ok(Json(TitleDetailResponse {
        details,
        cast,
        trailers,
    }))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<CandidateContent>>> {
    let results = state.catalog.search(&params.q).await?;
    Ok(Json(results))
}
