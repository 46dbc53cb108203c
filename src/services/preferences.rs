use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::Datastore,
    error::{AppError, AppResult},
    models::{GenreStat, UserSettings},
    services::{
        genre_stats::{analyze_watch_history, ranked_genres},
        watch_history::WatchHistory,
    },
};

/// Genre analysis and ranking settings for a user
pub struct PreferenceService {
    store: Arc<dyn Datastore>,
    history: Arc<WatchHistory>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn Datastore>, history: Arc<WatchHistory>) -> Self {
        Self { store, history }
    }

    /// Recomputes and stores the user's genre statistics, largest share first
    pub async fn analyze(&self, user_id: Uuid) -> AppResult<Vec<GenreStat>> {
        let watched = self.history.list_watched(user_id).await?;
        let stats = analyze_watch_history(self.store.as_ref(), user_id, &watched).await?;
        Ok(ranked_genres(&stats))
    }

    /// Stored settings, or the defaults for a user without a preferences row
    pub async fn settings(&self, user_id: Uuid) -> AppResult<UserSettings> {
        Ok(self
            .store
            .get_preferences(user_id)
            .await?
            .map(|prefs| prefs.settings())
            .unwrap_or_default())
    }

    pub async fn update_settings(
        &self,
        user_id: Uuid,
        settings: UserSettings,
    ) -> AppResult<UserSettings> {
        let settings = UserSettings {
            ai_enabled: settings.ai_enabled,
            original_language: normalize_language(settings.original_language)?,
        };

        let prefs = self
            .store
            .upsert_settings(user_id, &settings, Utc::now())
            .await?;

        tracing::info!(
            user_id = %user_id,
            ai_enabled = prefs.ai_enabled,
            original_language = prefs.original_language.as_deref().unwrap_or("any"),
            "Settings updated"
        );

        Ok(prefs.settings())
    }
}

/// Accepts a two-letter ISO 639-1 code in any case; blank clears the filter
fn normalize_language(language: Option<String>) -> AppResult<Option<String>> {
    let Some(language) = language else {
        return Ok(None);
    };

    let code = language.trim().to_ascii_lowercase();
    if code.is_empty() {
        return Ok(None);
    }
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not a two-letter language code",
            language.trim()
        )));
    }

    Ok(Some(code))
}
