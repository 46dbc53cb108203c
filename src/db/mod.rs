use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        GenreStats, MediaType, NewProfile, NewWatchedItem, Profile, UserPreferences,
        UserSettings, WatchedItem,
    },
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;

/// Row store holding watched items, preference snapshots and profiles.
///
/// Lookups that find no row return `Ok(None)`; only real failures are errors.
/// Every call is scoped by an explicit user id.
#[async_trait::async_trait]
pub trait Datastore: Send + Sync {
    /// A user's watched items, newest first
    async fn list_watched(&self, user_id: Uuid) -> AppResult<Vec<WatchedItem>>;

    async fn find_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<Option<WatchedItem>>;

    /// Fails with `Conflict` if the user already has this item
    async fn insert_watched(&self, item: NewWatchedItem) -> AppResult<WatchedItem>;

    /// Returns whether a row was deleted
    async fn delete_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<bool>;

    async fn get_preferences(&self, user_id: Uuid) -> AppResult<Option<UserPreferences>>;

    /// Replaces the genre statistics snapshot, creating the row if absent
    async fn upsert_genre_stats(
        &self,
        user_id: Uuid,
        genre_stats: &GenreStats,
        updated_at: DateTime<Utc>,
    ) -> AppResult<UserPreferences>;

    /// Replaces the ranking settings, creating the row if absent
    async fn upsert_settings(
        &self,
        user_id: Uuid,
        settings: &UserSettings,
        updated_at: DateTime<Utc>,
    ) -> AppResult<UserPreferences>;

    async fn get_profile(&self, id: Uuid) -> AppResult<Option<Profile>>;

    /// Fails with `Conflict` if a profile with this id exists
    async fn insert_profile(&self, profile: NewProfile) -> AppResult<Profile>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
