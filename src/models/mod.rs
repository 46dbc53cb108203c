use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod catalog;
pub mod content;
pub mod preferences;
pub mod profile;
pub mod watched;

pub use catalog::{
    ApiCastMember, ApiCredits, ApiGenreList, ApiPage, ApiTitle, ApiTitleDetails, ApiVideo,
    ApiVideos, CastMember, TitleDetails, Trailer,
};
pub use content::{Bucket, CandidateContent, ScoreBreakdown, ScoredContent};
pub use preferences::{GenreStat, GenreStats, UserPreferences, UserSettings};
pub use profile::{NewProfile, Profile};
pub use watched::{NewWatchedItem, WatchedItem};

/// Catalog media type, used in catalog URLs and stored on watched items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

/// Catalog genre tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}
