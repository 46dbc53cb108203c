use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::models::{Bucket, CandidateContent, GenreStats, ScoreBreakdown, ScoredContent};

/// Titles released within this many months are `Recent`
const RECENT_MONTHS: f64 = 3.0;
/// Popularity score above which a title is `Trending`
const TRENDING_POPULARITY: f64 = 15.0;
/// Base score above which a title is `HighlyRated`
const HIGHLY_RATED_BASE: f64 = 75.0;

const GENRE_WEIGHT: f64 = 0.6;
const POPULARITY_WEIGHT: f64 = 0.2;
const RECENCY_WEIGHT: f64 = 0.2;

/// Per-bucket selection quota, in selection order
pub const BUCKET_QUOTAS: [(Bucket, usize); 4] = [
    (Bucket::HighlyRated, 4),
    (Bucket::Trending, 4),
    (Bucket::Discovery, 3),
    (Bucket::Recent, 3),
];

/// Ranks candidates against a user's genre preferences, then samples a
/// diverse set across the four buckets.
///
/// Output order is random by design; the random source is supplied by the
/// caller.
#[derive(Debug, Clone)]
pub struct HeuristicRanker {
    limit: usize,
}

impl Default for HeuristicRanker {
    fn default() -> Self {
        Self::new(BUCKET_QUOTAS.iter().map(|(_, quota)| quota).sum())
    }
}

impl HeuristicRanker {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Scores one candidate
    pub fn score(
        &self,
        content: &CandidateContent,
        preferences: &GenreStats,
        today: NaiveDate,
    ) -> (f64, ScoreBreakdown) {
        let base_score = content.vote_average * 10.0;

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for genre_id in &content.genre_ids {
            if let Some(stat) = preferences.get(genre_id) {
                let weight = stat.percentage / 100.0;
                weighted_sum += base_score * weight;
                total_weight += weight;
            }
        }
        let genre_score = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };
        let genre_weighted = if total_weight > 0.0 {
            genre_score
        } else {
            base_score
        };

        let popularity_score = (content.popularity / 5.0).min(20.0);

        let years_old = today.year() - release_or(content, today).year();
        let recency_score = if years_old <= 2 {
            10.0
        } else {
            (10.0 - f64::from(years_old - 2) * 2.0).max(0.0)
        };

        let score = GENRE_WEIGHT * genre_weighted
            + POPULARITY_WEIGHT * popularity_score
            + RECENCY_WEIGHT * recency_score;

        (
            score,
            ScoreBreakdown {
                base_score,
                genre_score,
                popularity_score,
                recency_score,
            },
        )
    }

    /// First matching bucket wins: recent, trending, highly rated, discovery
    pub fn bucket(
        &self,
        content: &CandidateContent,
        breakdown: &ScoreBreakdown,
        today: NaiveDate,
    ) -> Bucket {
        let days_old = (today - release_or(content, today)).num_days();
        let months_old = days_old as f64 / 30.0;

        if months_old <= RECENT_MONTHS {
            Bucket::Recent
        } else if breakdown.popularity_score > TRENDING_POPULARITY {
            Bucket::Trending
        } else if breakdown.base_score > HIGHLY_RATED_BASE {
            Bucket::HighlyRated
        } else {
            Bucket::Discovery
        }
    }

    pub fn score_all(
        &self,
        candidates: Vec<CandidateContent>,
        preferences: &GenreStats,
        today: NaiveDate,
    ) -> Vec<ScoredContent> {
        candidates
            .into_iter()
            .map(|content| {
                let (score, breakdown) = self.score(&content, preferences, today);
                let bucket = self.bucket(&content, &breakdown, today);
                ScoredContent {
                    content,
                    score,
                    breakdown,
                    bucket,
                }
            })
            .collect()
    }

    /// Picks up to `limit` candidates: each bucket is sampled up to its quota,
    /// shortfalls are filled from the unselected remainder, and the final
    /// list is shuffled.
    pub fn rank<R: Rng + ?Sized>(
        &self,
        candidates: Vec<CandidateContent>,
        preferences: &GenreStats,
        today: NaiveDate,
        rng: &mut R,
    ) -> Vec<CandidateContent> {
        let mut seen = HashSet::new();
        let candidates: Vec<CandidateContent> = candidates
            .into_iter()
            .filter(|c| seen.insert((c.media_type, c.id)))
            .collect();

        let scored = self.score_all(candidates, preferences, today);
        let (selected, _) = self.select(scored, rng);
        selected.into_iter().map(|s| s.content).collect()
    }

    /// Bucketed selection; returns the selection and the unselected rest
    pub fn select<R: Rng + ?Sized>(
        &self,
        scored: Vec<ScoredContent>,
        rng: &mut R,
    ) -> (Vec<ScoredContent>, Vec<ScoredContent>) {
        let mut pools: Vec<(Bucket, Vec<ScoredContent>)> = BUCKET_QUOTAS
            .iter()
            .map(|(bucket, _)| (*bucket, Vec::new()))
            .collect();
        for item in scored {
            if let Some((_, pool)) = pools.iter_mut().find(|(bucket, _)| *bucket == item.bucket) {
                pool.push(item);
            }
        }

        let mut selected = Vec::with_capacity(self.limit);
        let mut remaining = Vec::new();
        for ((_, quota), (_, mut pool)) in BUCKET_QUOTAS.iter().zip(pools) {
            pool.shuffle(rng);
            let take = (*quota).min(pool.len());
            remaining.extend(pool.split_off(take));
            selected.extend(pool);
        }

        if selected.len() < self.limit {
            remaining.shuffle(rng);
            let take = (self.limit - selected.len()).min(remaining.len());
            let rest = remaining.split_off(take);
            selected.extend(remaining);
            remaining = rest;
        }

        selected.shuffle(rng);
        if selected.len() > self.limit {
            remaining.extend(selected.split_off(self.limit));
        }

        (selected, remaining)
    }
}

/// Titles without a release date are treated as releasing today
fn release_or(content: &CandidateContent, today: NaiveDate) -> NaiveDate {
    content.release_date.unwrap_or(today)
}
