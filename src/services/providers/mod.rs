/// External data providers.
///
/// The catalog provider supplies title metadata and per-title recommendation
/// lists; the similarity provider scores one text against many. Both are
/// traits so the ranking services can run against mocks.
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{CandidateContent, CastMember, MediaType, TitleDetails, Trailer},
};

pub mod huggingface;
pub mod tmdb;

pub use huggingface::HuggingFaceSimilarity;
pub use tmdb::TmdbCatalog;

/// Read-only movie/TV metadata source
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// First page of currently popular titles
    async fn popular(&self, media_type: MediaType) -> AppResult<Vec<CandidateContent>>;

    /// First page of top-rated titles
    async fn top_rated(&self, media_type: MediaType) -> AppResult<Vec<CandidateContent>>;

    /// Full title detail; `NotFound` for an unknown id
    async fn details(&self, media_type: MediaType, id: i64) -> AppResult<TitleDetails>;

    async fn credits(&self, media_type: MediaType, id: i64) -> AppResult<Vec<CastMember>>;

    async fn trailers(&self, media_type: MediaType, id: i64) -> AppResult<Vec<Trailer>>;

    /// Titles the catalog recommends for viewers of `id`
    async fn recommendations(
        &self,
        media_type: MediaType,
        id: i64,
    ) -> AppResult<Vec<CandidateContent>>;

    /// Free-text search across movies and TV shows
    async fn search(&self, query: &str) -> AppResult<Vec<CandidateContent>>;

    /// Genre id to localized name table
    async fn genres(&self, media_type: MediaType) -> AppResult<HashMap<i64, String>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Sentence-similarity scorer
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SimilarityProvider: Send + Sync {
    /// Scores `source` against each of `sentences`.
    ///
    /// The result is parallel to `sentences`.
    async fn similarities(&self, source: &str, sentences: &[String]) -> AppResult<Vec<f64>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
