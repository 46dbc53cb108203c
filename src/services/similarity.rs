use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateContent, WatchedItem},
    services::providers::SimilarityProvider,
};

const SIMILARITY_WEIGHT: f64 = 0.7;
const RATING_WEIGHT: f64 = 0.3;

/// Blend of best textual similarity and catalog rating
pub fn combined_score(max_similarity: f64, vote_average: f64) -> f64 {
    SIMILARITY_WEIGHT * max_similarity + RATING_WEIGHT * (vote_average / 10.0)
}

/// Result of scoring one candidate against the watch history
#[derive(Debug, Clone, Copy, PartialEq)]
enum SimilarityOutcome {
    Scored(f64),
    Failed,
}

/// Orders candidates by how closely their descriptions match anything the
/// user has watched.
///
/// One similarity call is made per candidate, at most `concurrency` at a
/// time, each bounded by `timeout`. A failed call scores its candidate with
/// neutral similarity instead of failing the batch; only a batch in which
/// every call failed is an error.
pub struct SimilarityRanker {
    provider: Arc<dyn SimilarityProvider>,
    concurrency: usize,
    timeout: Duration,
    threshold: f64,
}

impl SimilarityRanker {
    pub fn new(
        provider: Arc<dyn SimilarityProvider>,
        concurrency: usize,
        timeout: Duration,
        threshold: f64,
    ) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
            timeout,
            threshold,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Returns candidates sorted by descending score.
    ///
    /// Candidates whose measured similarity is below the threshold are
    /// dropped. Ties keep input order.
    pub async fn rank(
        &self,
        candidates: Vec<CandidateContent>,
        watched: &[WatchedItem],
    ) -> AppResult<Vec<CandidateContent>> {
        if candidates.is_empty() || watched.is_empty() {
            return Ok(Vec::new());
        }

        let watched_descriptors: Vec<String> = watched.iter().map(WatchedItem::descriptor).collect();
        let watched_descriptors = &watched_descriptors;
        let provider = &self.provider;
        let timeout = self.timeout;

        tracing::info!(
            candidates = candidates.len(),
            watched = watched.len(),
            concurrency = self.concurrency,
            provider = provider.name(),
            "Similarity ranking started"
        );

        let requests: Vec<(usize, i64, String)> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| (index, candidate.id, candidate.descriptor()))
            .collect();

        let mut outcomes: Vec<(usize, SimilarityOutcome)> = stream::iter(requests)
            .map(|(index, content_id, descriptor)| async move {
                let call = provider.similarities(&descriptor, watched_descriptors);
                let outcome = match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(scores)) => match max_similarity(&scores) {
                        Some(max) => SimilarityOutcome::Scored(max),
                        None => {
                            tracing::warn!(content_id, "Similarity returned no scores");
                            SimilarityOutcome::Failed
                        }
                    },
                    Ok(Err(e)) => {
                        tracing::warn!(content_id, error = %e, "Similarity call failed");
                        SimilarityOutcome::Failed
                    }
                    Err(_) => {
                        tracing::warn!(
                            content_id,
                            timeout_ms = timeout.as_millis() as u64,
                            "Similarity call timed out"
                        );
                        SimilarityOutcome::Failed
                    }
                };
                (index, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let failed = outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == SimilarityOutcome::Failed)
            .count();
        if failed == outcomes.len() {
            return Err(AppError::Similarity(format!(
                "all {} similarity calls failed",
                failed
            )));
        }

        outcomes.sort_by_key(|(index, _)| *index);

        let mut scored: Vec<(usize, f64, CandidateContent)> = candidates
            .into_iter()
            .zip(outcomes)
            .filter_map(|(candidate, (index, outcome))| {
                let similarity = match outcome {
                    SimilarityOutcome::Scored(s) if s < self.threshold => return None,
                    SimilarityOutcome::Scored(s) => s,
                    SimilarityOutcome::Failed => 0.0,
                };
                let score = combined_score(similarity, candidate.vote_average);
                Some((index, score, candidate))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        tracing::info!(
            ranked = scored.len(),
            failed_calls = failed,
            "Similarity ranking completed"
        );

        Ok(scored.into_iter().map(|(_, _, candidate)| candidate).collect())
    }
}

fn max_similarity(scores: &[f64]) -> Option<f64> {
    scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .reduce(f64::max)
}
