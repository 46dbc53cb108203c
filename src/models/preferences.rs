use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Share of a user's watched genre tags that belong to one genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreStat {
    pub genre_id: i64,
    pub name: String,
    pub count: u32,
    pub percentage: f64,
}

/// Genre statistics keyed by genre id
pub type GenreStats = BTreeMap<i64, GenreStat>;

/// Per-user preference snapshot (one row per user)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub genre_stats: GenreStats,
    pub ai_enabled: bool,
    /// When set, candidates are restricted to this original-language tag
    pub original_language: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Preferences for a user that has never been analyzed
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            genre_stats: GenreStats::new(),
            ai_enabled: false,
            original_language: None,
            updated_at: now,
        }
    }

    pub fn settings(&self) -> UserSettings {
        UserSettings {
            ai_enabled: self.ai_enabled,
            original_language: self.original_language.clone(),
        }
    }
}

/// User-toggled ranking settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub ai_enabled: bool,
    #[serde(default)]
    pub original_language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_preferences() {
        let user_id = Uuid::new_v4();
        let prefs = UserPreferences::empty(user_id, Utc::now());
        assert_eq!(prefs.user_id, user_id);
        assert!(prefs.genre_stats.is_empty());
        assert_eq!(prefs.settings(), UserSettings::default());
    }

    #[test]
    fn test_settings_deserialize_without_language() {
        let settings: UserSettings = serde_json::from_str(r#"{"ai_enabled": true}"#).unwrap();
        assert!(settings.ai_enabled);
        assert_eq!(settings.original_language, None);
    }
}
