use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{CandidateContent, Genre, MediaType};

// ============================================================================
// Catalog (TMDB) API Types
// ============================================================================

/// Paged list response (`/movie/popular`, `/tv/{id}/recommendations`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPage<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// List entry shared by movie and TV results.
///
/// Movies carry `title`/`release_date`, TV shows `name`/`first_air_date`.
/// Multi-search results additionally carry `media_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTitle {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl ApiTitle {
    /// Converts a list entry into a candidate; genre names are filled in later
    pub fn into_candidate(self, media_type: MediaType) -> CandidateContent {
        let release_date = parse_catalog_date(
            self.release_date
                .as_deref()
                .or(self.first_air_date.as_deref()),
        );

        CandidateContent {
            id: self.id,
            media_type,
            title: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview.unwrap_or_default(),
            genres: Vec::new(),
            genre_ids: self.genre_ids,
            popularity: self.popularity,
            vote_average: self.vote_average,
            release_date,
            original_language: self.original_language,
            poster_path: self.poster_path,
        }
    }
}

/// Catalog dates are `YYYY-MM-DD`, and often empty strings for unreleased titles
pub fn parse_catalog_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// `GET /{media}/{id}` response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTitleDetails {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub tagline: Option<String>,
}

/// `GET /genre/{media}/list` response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl ApiGenreList {
    pub fn into_lookup(self) -> HashMap<i64, String> {
        self.genres.into_iter().map(|g| (g.id, g.name)).collect()
    }
}

/// `GET /{media}/{id}/credits` response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCredits {
    #[serde(default)]
    pub cast: Vec<ApiCastMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

/// `GET /{media}/{id}/videos` response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideos {
    #[serde(default)]
    pub results: Vec<ApiVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideo {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

impl ApiVideo {
    /// YouTube trailers and teasers are the only videos surfaced
    pub fn into_trailer(self) -> Option<Trailer> {
        let is_trailer = self.video_type == "Trailer" || self.video_type == "Teaser";
        if self.site != "YouTube" || !is_trailer {
            return None;
        }
        Some(Trailer {
            url: format!("https://www.youtube.com/watch?v={}", self.key),
            key: self.key,
            name: self.name,
        })
    }
}

// ============================================================================
// Client-facing catalog types
// ============================================================================

/// Title detail returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleDetails {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub overview: String,
    pub genres: Vec<Genre>,
    pub vote_average: f64,
    pub popularity: f64,
    pub release_date: Option<NaiveDate>,
    pub original_language: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub runtime: Option<u32>,
    pub number_of_seasons: Option<u32>,
    pub tagline: Option<String>,
}

impl ApiTitleDetails {
    pub fn into_details(self, media_type: MediaType) -> TitleDetails {
        let release_date = parse_catalog_date(
            self.release_date
                .as_deref()
                .or(self.first_air_date.as_deref()),
        );

        TitleDetails {
            id: self.id,
            media_type,
            title: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview.unwrap_or_default(),
            genres: self.genres,
            vote_average: self.vote_average,
            popularity: self.popularity,
            release_date,
            original_language: self.original_language,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            runtime: self.runtime,
            number_of_seasons: self.number_of_seasons,
            tagline: self.tagline.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

impl From<ApiCastMember> for CastMember {
    fn from(member: ApiCastMember) -> Self {
        Self {
            id: member.id,
            name: member.name,
            character: member.character,
            profile_path: member.profile_path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trailer {
    pub key: String,
    pub name: String,
    pub url: String,
}
