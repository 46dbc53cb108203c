use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::Datastore,
    error::{AppError, AppResult},
    models::{
        GenreStats, MediaType, NewProfile, NewWatchedItem, Profile, UserPreferences,
        UserSettings, WatchedItem,
    },
};

/// In-process datastore used when no database is configured, and in tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    watched: HashMap<Uuid, Vec<WatchedItem>>,
    preferences: HashMap<Uuid, UserPreferences>,
    profiles: HashMap<Uuid, Profile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Datastore for MemoryStore {
    async fn list_watched(&self, user_id: Uuid) -> AppResult<Vec<WatchedItem>> {
        let inner = self.inner.read().await;
        // Insertion order reversed first so equal timestamps still list newest first
        let mut items: Vec<WatchedItem> = inner
            .watched
            .get(&user_id)
            .map(|items| items.iter().rev().cloned().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn find_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<Option<WatchedItem>> {
        let inner = self.inner.read().await;
        Ok(inner.watched.get(&user_id).and_then(|items| {
            items
                .iter()
                .find(|item| item.key() == (media_type, content_id))
                .cloned()
        }))
    }

    async fn insert_watched(&self, item: NewWatchedItem) -> AppResult<WatchedItem> {
        let mut inner = self.inner.write().await;
        let items = inner.watched.entry(item.user_id).or_default();

        if items
            .iter()
            .any(|existing| existing.key() == (item.media_type, item.content_id))
        {
            return Err(AppError::Conflict(format!(
                "{} {} is already marked as watched",
                item.media_type, item.content_id
            )));
        }

        let item = item.into_item(Utc::now());
        items.push(item.clone());
        Ok(item)
    }

    async fn delete_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(items) = inner.watched.get_mut(&user_id) else {
            return Ok(false);
        };

        let before = items.len();
        items.retain(|item| item.key() != (media_type, content_id));
        Ok(items.len() < before)
    }

    async fn get_preferences(&self, user_id: Uuid) -> AppResult<Option<UserPreferences>> {
        let inner = self.inner.read().await;
        Ok(inner.preferences.get(&user_id).cloned())
    }

    async fn upsert_genre_stats(
        &self,
        user_id: Uuid,
        genre_stats: &GenreStats,
        updated_at: DateTime<Utc>,
    ) -> AppResult<UserPreferences> {
        let mut inner = self.inner.write().await;
        let prefs = inner
            .preferences
            .entry(user_id)
            .or_insert_with(|| UserPreferences::empty(user_id, updated_at));
        prefs.genre_stats = genre_stats.clone();
        prefs.updated_at = updated_at;
        Ok(prefs.clone())
    }

    async fn upsert_settings(
        &self,
        user_id: Uuid,
        settings: &UserSettings,
        updated_at: DateTime<Utc>,
    ) -> AppResult<UserPreferences> {
        let mut inner = self.inner.write().await;
        let prefs = inner
            .preferences
            .entry(user_id)
            .or_insert_with(|| UserPreferences::empty(user_id, updated_at));
        prefs.ai_enabled = settings.ai_enabled;
        prefs.original_language = settings.original_language.clone();
        prefs.updated_at = updated_at;
        Ok(prefs.clone())
    }

    async fn get_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> AppResult<Profile> {
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.id) {
            return Err(AppError::Conflict(format!(
                "Profile {} already exists",
                profile.id
            )));
        }

        let created = Profile {
            id: profile.id,
            full_name: profile.full_name.trim().to_string(),
            email: profile.email.trim().to_string(),
            created_at: Utc::now(),
        };
        inner.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
