use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Genre, MediaType};

/// A user's record of having watched a movie or TV show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedItem {
    pub user_id: Uuid,
    pub content_id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub overview: String,
    pub genres: Vec<Genre>,
    pub created_at: DateTime<Utc>,
}

impl WatchedItem {
    /// Key identifying this item within a user's history
    pub fn key(&self) -> (MediaType, i64) {
        (self.media_type, self.content_id)
    }

    /// Text used to compare candidates against this item
    pub fn descriptor(&self) -> String {
        let genres: Vec<&str> = self.genres.iter().map(|g| g.name.as_str()).collect();
        format!("{}. {}. {}", self.title, self.overview, genres.join(", "))
    }
}

/// Data needed to record a new watched item
#[derive(Debug, Clone, PartialEq)]
pub struct NewWatchedItem {
    pub user_id: Uuid,
    pub content_id: i64,
    pub media_type: MediaType,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub overview: String,
    pub genres: Vec<Genre>,
}

impl NewWatchedItem {
    /// Stamps the item with its creation time
    pub fn into_item(self, created_at: DateTime<Utc>) -> WatchedItem {
        WatchedItem {
            user_id: self.user_id,
            content_id: self.content_id,
            media_type: self.media_type,
            title: self.title,
            poster_path: self.poster_path,
            vote_average: self.vote_average,
            overview: self.overview,
            genres: self.genres,
            created_at,
        }
    }
}
