use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    db::Datastore,
    error::{AppError, AppResult},
    models::{
        Genre, GenreStats, MediaType, NewProfile, NewWatchedItem, Profile, UserPreferences,
        UserSettings, WatchedItem,
    },
};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Postgres-backed datastore
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct WatchedRow {
    user_id: Uuid,
    content_id: i64,
    media_type: String,
    title: String,
    poster_path: Option<String>,
    vote_average: f64,
    overview: String,
    genres: Json<Vec<Genre>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<WatchedRow> for WatchedItem {
    type Error = AppError;

    fn try_from(row: WatchedRow) -> AppResult<Self> {
        let media_type = row
            .media_type
            .parse::<MediaType>()
            .map_err(AppError::Internal)?;

        Ok(WatchedItem {
            user_id: row.user_id,
            content_id: row.content_id,
            media_type,
            title: row.title,
            poster_path: row.poster_path,
            vote_average: row.vote_average,
            overview: row.overview,
            genres: row.genres.0,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct PreferencesRow {
    user_id: Uuid,
    genre_stats: Json<GenreStats>,
    ai_enabled: bool,
    original_language: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<PreferencesRow> for UserPreferences {
    fn from(row: PreferencesRow) -> Self {
        Self {
            user_id: row.user_id,
            genre_stats: row.genre_stats.0,
            ai_enabled: row.ai_enabled,
            original_language: row.original_language,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    full_name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

const WATCHED_COLUMNS: &str =
    "user_id, content_id, media_type, title, poster_path, vote_average, overview, genres, created_at";

const PREFERENCES_COLUMNS: &str =
    "user_id, genre_stats, ai_enabled, original_language, updated_at";

#[async_trait::async_trait]
impl Datastore for PgStore {
    async fn list_watched(&self, user_id: Uuid) -> AppResult<Vec<WatchedItem>> {
        let rows: Vec<WatchedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM watched_items WHERE user_id = $1 ORDER BY created_at DESC",
            WATCHED_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WatchedItem::try_from).collect()
    }

    async fn find_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<Option<WatchedItem>> {
        let row: Option<WatchedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM watched_items WHERE user_id = $1 AND media_type = $2 AND content_id = $3",
            WATCHED_COLUMNS
        ))
        .bind(user_id)
        .bind(media_type.as_str())
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WatchedItem::try_from).transpose()
    }

    async fn insert_watched(&self, item: NewWatchedItem) -> AppResult<WatchedItem> {
        let row: Option<WatchedRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO watched_items
                (user_id, content_id, media_type, title, poster_path, vote_average, overview, genres, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, media_type, content_id) DO NOTHING
            RETURNING {}
            "#,
            WATCHED_COLUMNS
        ))
        .bind(item.user_id)
        .bind(item.content_id)
        .bind(item.media_type.as_str())
        .bind(&item.title)
        .bind(&item.poster_path)
        .bind(item.vote_average)
        .bind(&item.overview)
        .bind(Json(&item.genres))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::Conflict(format!(
                "{} {} is already marked as watched",
                item.media_type, item.content_id
            ))),
        }
    }

    async fn delete_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM watched_items WHERE user_id = $1 AND media_type = $2 AND content_id = $3",
        )
        .bind(user_id)
        .bind(media_type.as_str())
        .bind(content_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_preferences(&self, user_id: Uuid) -> AppResult<Option<UserPreferences>> {
        let row: Option<PreferencesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_preferences WHERE user_id = $1",
            PREFERENCES_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserPreferences::from))
    }

    async fn upsert_genre_stats(
        &self,
        user_id: Uuid,
        genre_stats: &GenreStats,
        updated_at: DateTime<Utc>,
    ) -> AppResult<UserPreferences> {
        let row: PreferencesRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO user_preferences (user_id, genre_stats, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
                SET genre_stats = EXCLUDED.genre_stats, updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            PREFERENCES_COLUMNS
        ))
        .bind(user_id)
        .bind(Json(genre_stats))
        .bind(updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn upsert_settings(
        &self,
        user_id: Uuid,
        settings: &UserSettings,
        updated_at: DateTime<Utc>,
    ) -> AppResult<UserPreferences> {
        let row: PreferencesRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO user_preferences (user_id, ai_enabled, original_language, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
                SET ai_enabled = EXCLUDED.ai_enabled,
                    original_language = EXCLUDED.original_language,
                    updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            PREFERENCES_COLUMNS
        ))
        .bind(user_id)
        .bind(settings.ai_enabled)
        .bind(&settings.original_language)
        .bind(updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let row: Option<ProfileRow> =
            sqlx::query_as("SELECT id, full_name, email, created_at FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Profile::from))
    }

    async fn insert_profile(&self, profile: NewProfile) -> AppResult<Profile> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            INSERT INTO profiles (id, full_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, full_name, email, created_at
            "#,
        )
        .bind(profile.id)
        .bind(profile.full_name.trim())
        .bind(profile.email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::from)
            .ok_or_else(|| AppError::Conflict(format!("Profile {} already exists", profile.id)))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
