use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Genre, MediaType};

/// A not-yet-watched title fetched from the catalog for ranking.
///
/// Never persisted; built per request from catalog recommendation lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateContent {
    pub id: i64,
    pub media_type: MediaType,
    /// `title` for movies, `name` for TV shows
    pub title: String,
    pub overview: String,
    /// Genre names, hydrated from the catalog genre table when known
    pub genres: Vec<Genre>,
    pub genre_ids: Vec<i64>,
    pub popularity: f64,
    pub vote_average: f64,
    /// Release date for movies, first air date for TV shows
    pub release_date: Option<NaiveDate>,
    pub original_language: Option<String>,
    pub poster_path: Option<String>,
}

impl CandidateContent {
    /// Text used to compare this title against a user's history
    pub fn descriptor(&self) -> String {
        let genres: Vec<&str> = self.genres.iter().map(|g| g.name.as_str()).collect();
        format!("{}. {}. {}", self.title, self.overview, genres.join(", "))
    }
}

/// Mutually exclusive diversity bucket used by the heuristic ranker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Recent,
    Trending,
    HighlyRated,
    Discovery,
}

/// Components of a heuristic score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// `vote_average * 10`, 0..=100
    pub base_score: f64,
    /// Preference-weighted base score, 0 when no genre matched
    pub genre_score: f64,
    /// 0..=20
    pub popularity_score: f64,
    /// 0..=10
    pub recency_score: f64,
}

/// A candidate with its derived ranking data; discarded after selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredContent {
    pub content: CandidateContent,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub bucket: Bucket,
}
