use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};

use crate::{
    models::{CandidateContent, Genre, MediaType, WatchedItem},
    services::providers::CatalogProvider,
};

/// Gathers recommendation candidates of one media type for a user.
///
/// Pulls the catalog's recommendations for each watched item of that type,
/// then applies [`filter_candidates`] and fills in genre names. Catalog
/// failures are logged and contribute nothing.
pub async fn acquire_candidates(
    catalog: &dyn CatalogProvider,
    watched: &[WatchedItem],
    media_type: MediaType,
    original_language: Option<&str>,
    concurrency: usize,
) -> Vec<CandidateContent> {
    let sources: Vec<i64> = watched
        .iter()
        .filter(|item| item.media_type == media_type)
        .map(|item| item.content_id)
        .collect();

    if sources.is_empty() {
        return Vec::new();
    }

    // `buffered` keeps source order so the first occurrence of a title wins
    let lists: Vec<Vec<CandidateContent>> = stream::iter(sources.iter().copied())
        .map(|source_id| async move {
            match catalog.recommendations(media_type, source_id).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(
                        media_type = %media_type,
                        source_id,
                        error = %e,
                        provider = catalog.name(),
                        "Recommendation fetch failed, skipping source"
                    );
                    Vec::new()
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let watched_ids: HashSet<i64> = sources.into_iter().collect();
    let mut candidates = filter_candidates(lists, &watched_ids, original_language);

    match catalog.genres(media_type).await {
        Ok(lookup) => hydrate_genres(&mut candidates, &lookup),
        Err(e) => {
            tracing::warn!(
                media_type = %media_type,
                error = %e,
                "Genre list unavailable, candidate genre names left empty"
            );
        }
    }

    tracing::info!(
        media_type = %media_type,
        candidates = candidates.len(),
        language = original_language.unwrap_or("any"),
        "Candidates acquired"
    );

    candidates
}

/// Unions the lists, keeping the first occurrence of each id, and drops
/// watched titles, titles without a synopsis and, when a language is given,
/// titles in any other original language.
pub fn filter_candidates(
    lists: Vec<Vec<CandidateContent>>,
    watched_ids: &HashSet<i64>,
    original_language: Option<&str>,
) -> Vec<CandidateContent> {
    let mut seen = HashSet::new();

    lists
        .into_iter()
        .flatten()
        .filter(|candidate| seen.insert(candidate.id))
        .filter(|candidate| !watched_ids.contains(&candidate.id))
        .filter(|candidate| !candidate.overview.trim().is_empty())
        .filter(|candidate| match original_language {
            Some(language) => candidate.original_language.as_deref() == Some(language),
            None => true,
        })
        .collect()
}

/// Fills `genres` from `genre_ids` using the catalog's genre table
pub fn hydrate_genres(candidates: &mut [CandidateContent], lookup: &HashMap<i64, String>) {
    for candidate in candidates.iter_mut() {
        if !candidate.genres.is_empty() {
            continue;
        }
        candidate.genres = candidate
            .genre_ids
            .iter()
            .filter_map(|id| {
                lookup.get(id).map(|name| Genre {
                    id: *id,
                    name: name.clone(),
                })
            })
            .collect();
    }
}
