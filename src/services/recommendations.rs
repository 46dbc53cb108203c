use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::Config,
    db::Datastore,
    error::AppResult,
    models::{CandidateContent, MediaType},
    services::{
        candidates::acquire_candidates, genre_stats::analyze_watch_history,
        heuristic::HeuristicRanker, providers::CatalogProvider, similarity::SimilarityRanker,
        watch_history::WatchHistory,
    },
};

/// Which ranker produced a recommendation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Heuristic,
    Ai,
    /// AI ranking was requested but failed or is not configured
    AiFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub media_type: MediaType,
    pub strategy: Strategy,
    pub items: Vec<CandidateContent>,
}

/// Sizing knobs for the ranking pipeline
#[derive(Debug, Clone)]
pub struct RankingOptions {
    /// AI-ranked candidates kept before sampling
    pub ai_candidate_pool: usize,
    pub recommendation_count: usize,
    /// Parallel catalog fetches during candidate acquisition
    pub fetch_concurrency: usize,
    pub rng_seed: Option<u64>,
}

impl RankingOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ai_candidate_pool: config.ai_candidate_pool,
            recommendation_count: config.recommendation_count,
            fetch_concurrency: config.similarity_concurrency,
            rng_seed: config.rng_seed,
        }
    }
}

/// Runs the full pipeline for one user and media type: watched view,
/// genre analysis, candidate acquisition, then ranking.
///
/// The AI ranker is used only when the user enabled it and a similarity
/// provider is configured. Any AI failure falls back to the heuristic
/// ranker over the same candidates.
pub struct RecommendationService {
    store: Arc<dyn Datastore>,
    catalog: Arc<dyn CatalogProvider>,
    history: Arc<WatchHistory>,
    similarity: Option<SimilarityRanker>,
    heuristic: HeuristicRanker,
    options: RankingOptions,
    rng: Mutex<StdRng>,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn Datastore>,
        catalog: Arc<dyn CatalogProvider>,
        history: Arc<WatchHistory>,
        similarity: Option<SimilarityRanker>,
        options: RankingOptions,
    ) -> Self {
        let rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store,
            catalog,
            history,
            similarity,
            heuristic: HeuristicRanker::new(options.recommendation_count),
            options,
            rng: Mutex::new(rng),
        }
    }

    pub fn ai_available(&self) -> bool {
        self.similarity.is_some()
    }

    pub async fn recommend(
        &self,
        user_id: Uuid,
        media_type: MediaType,
    ) -> AppResult<Recommendations> {
        // Each request draws its own generator so the shared one is never
        // held across a remote call
        let mut rng = {
            let mut shared = self.rng.lock().await;
            StdRng::seed_from_u64(shared.gen())
        };

        self.recommend_with(user_id, media_type, Utc::now().date_naive(), &mut rng)
            .await
    }

    /// `recommend` with the date and random source supplied by the caller
    pub async fn recommend_with<R: Rng + Send + ?Sized>(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        today: NaiveDate,
        rng: &mut R,
    ) -> AppResult<Recommendations> {
        let watched = self.history.list_watched(user_id).await?;
        let genre_stats = analyze_watch_history(self.store.as_ref(), user_id, &watched).await?;
        let settings = self
            .store
            .get_preferences(user_id)
            .await?
            .map(|prefs| prefs.settings())
            .unwrap_or_default();

        let candidates = acquire_candidates(
            self.catalog.as_ref(),
            &watched,
            media_type,
            settings.original_language.as_deref(),
            self.options.fetch_concurrency,
        )
        .await;

        let (strategy, items) = match (&self.similarity, settings.ai_enabled) {
            (Some(ranker), true) => match ranker.rank(candidates.clone(), &watched).await {
                Ok(ranked) => (Strategy::Ai, self.sample(ranked, rng)),
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        provider = ranker.provider_name(),
                        "AI ranking failed, falling back to heuristic ranker"
                    );
                    (
                        Strategy::AiFallback,
                        self.heuristic.rank(candidates, &genre_stats, today, rng),
                    )
                }
            },
            (None, true) => {
                tracing::warn!(
                    user_id = %user_id,
                    "AI ranking requested but no similarity provider is configured"
                );
                (
                    Strategy::AiFallback,
                    self.heuristic.rank(candidates, &genre_stats, today, rng),
                )
            }
            (_, false) => (
                Strategy::Heuristic,
                self.heuristic.rank(candidates, &genre_stats, today, rng),
            ),
        };

        tracing::info!(
            user_id = %user_id,
            media_type = %media_type,
            strategy = ?strategy,
            watched = watched.len(),
            recommendations = items.len(),
            "Recommendations generated"
        );

        Ok(Recommendations {
            media_type,
            strategy,
            items,
        })
    }

    /// Keeps the top of the AI ranking, then samples from it at random
    fn sample<R: Rng + ?Sized>(
        &self,
        mut ranked: Vec<CandidateContent>,
        rng: &mut R,
    ) -> Vec<CandidateContent> {
        ranked.truncate(self.options.ai_candidate_pool);
        ranked
            .choose_multiple(rng, self.options.recommendation_count)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::AppError;
    use crate::models::{Bucket, Genre, GenreStats, NewWatchedItem, TitleDetails, UserSettings};
    use crate::services::providers::{MockCatalogProvider, MockSimilarityProvider};
    use chrono::Months;
    use std::collections::{HashMap, HashSet};

    const SOURCE_ID: i64 = 1;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn candidate(id: i64, vote_average: f64, popularity: f64, months_old: u32) -> CandidateContent {
        CandidateContent {
            id,
            media_type: MediaType::Movie,
            title: format!("Title {}", id),
            overview: "Overview".to_string(),
            genres: Vec::new(),
            genre_ids: vec![18],
            popularity,
            vote_average,
            release_date: today().checked_sub_months(Months::new(months_old)),
            original_language: Some("en".to_string()),
            poster_path: None,
        }
    }

    /// Ten candidates in each bucket
    fn bucketed_candidates() -> Vec<CandidateContent> {
        (0..10)
            .flat_map(|i| {
                vec![
                    candidate(100 + i, 6.0, 10.0, 0),
                    candidate(200 + i, 6.0, 200.0, 60),
                    candidate(300 + i, 8.5, 10.0, 60),
                    candidate(400 + i, 6.0, 10.0, 60),
                ]
            })
            .collect()
    }

    fn details(media_type: MediaType, id: i64) -> TitleDetails {
        TitleDetails {
            id,
            media_type,
            title: format!("Title {}", id),
            overview: "Overview".to_string(),
            genres: vec![Genre {
                id: 18,
                name: "Drama".to_string(),
            }],
            vote_average: 7.0,
            popularity: 10.0,
            release_date: None,
            original_language: Some("en".to_string()),
            poster_path: None,
            backdrop_path: None,
            runtime: None,
            number_of_seasons: None,
            tagline: None,
        }
    }

    fn catalog_with(candidates: Vec<CandidateContent>) -> MockCatalogProvider {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_recommendations()
            .returning(move |_, _| Ok(candidates.clone()));
        catalog.expect_genres().returning(|_| Ok(HashMap::new()));
        catalog
            .expect_details()
            .returning(|media_type, id| Ok(details(media_type, id)));
        catalog
    }

    fn failing_similarity() -> MockSimilarityProvider {
        let mut provider = MockSimilarityProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_similarities()
            .returning(|_, _| Err(AppError::ExternalApi("service unavailable".to_string())));
        provider
    }

    fn options() -> RankingOptions {
        RankingOptions {
            ai_candidate_pool: 500,
            recommendation_count: 14,
            fetch_concurrency: 4,
            rng_seed: Some(7),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        service: RecommendationService,
    }

    fn fixture(catalog: MockCatalogProvider, similarity: Option<MockSimilarityProvider>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let catalog: Arc<dyn CatalogProvider> = Arc::new(catalog);
        let history = Arc::new(WatchHistory::new(
            store.clone(),
            catalog.clone(),
            chrono::Duration::seconds(60),
        ));
        let similarity = similarity.map(|provider| {
            SimilarityRanker::new(
                Arc::new(provider),
                4,
                std::time::Duration::from_secs(5),
                0.0,
            )
        });
        let service =
            RecommendationService::new(store.clone(), catalog, history, similarity, options());
        Fixture { store, service }
    }

    async fn watch_source(store: &MemoryStore, user_id: Uuid) {
        store
            .insert_watched(NewWatchedItem {
                user_id,
                content_id: SOURCE_ID,
                media_type: MediaType::Movie,
                title: "Source".to_string(),
                poster_path: None,
                vote_average: 8.0,
                overview: "Source overview".to_string(),
                genres: vec![Genre {
                    id: 18,
                    name: "Drama".to_string(),
                }],
            })
            .await
            .unwrap();
    }

    async fn enable_ai(store: &MemoryStore, user_id: Uuid) {
        store
            .upsert_settings(
                user_id,
                &UserSettings {
                    ai_enabled: true,
                    original_language: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
    }

    fn bucket_counts(items: &[CandidateContent]) -> HashMap<Bucket, usize> {
        let ranker = HeuristicRanker::default();
        let mut counts = HashMap::new();
        for content in items {
            let (_, breakdown) = ranker.score(content, &GenreStats::new(), today());
            *counts
                .entry(ranker.bucket(content, &breakdown, today()))
                .or_insert(0) += 1;
        }
        counts
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_heuristic() {
        let fx = fixture(catalog_with(bucketed_candidates()), Some(failing_similarity()));
        let user = Uuid::new_v4();
        watch_source(&fx.store, user).await;
        enable_ai(&fx.store, user).await;

        let result = fx
            .service
            .recommend_with(user, MediaType::Movie, today(), &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();

        assert_eq!(result.strategy, Strategy::AiFallback);

        // Same inputs and seed through the heuristic ranker alone
        let stats = fx.store.get_preferences(user).await.unwrap().unwrap().genre_stats;
        let expected = HeuristicRanker::new(14).rank(
            bucketed_candidates(),
            &stats,
            today(),
            &mut StdRng::seed_from_u64(5),
        );

        let ids: Vec<i64> = result.items.iter().map(|c| c.id).collect();
        let expected_ids: Vec<i64> = expected.iter().map(|c| c.id).collect();
        assert_eq!(ids, expected_ids);

        let counts = bucket_counts(&result.items);
        assert_eq!(counts.get(&Bucket::HighlyRated), Some(&4));
        assert_eq!(counts.get(&Bucket::Trending), Some(&4));
        assert_eq!(counts.get(&Bucket::Discovery), Some(&3));
        assert_eq!(counts.get(&Bucket::Recent), Some(&3));
    }

    #[tokio::test]
    async fn test_ai_success_samples_recommendation_count() {
        let mut similarity = MockSimilarityProvider::new();
        similarity.expect_name().return_const("mock");
        similarity
            .expect_similarities()
            .returning(|_, sentences| Ok(vec![0.4; sentences.len()]));

        let fx = fixture(catalog_with(bucketed_candidates()), Some(similarity));
        let user = Uuid::new_v4();
        watch_source(&fx.store, user).await;
        enable_ai(&fx.store, user).await;

        let result = fx.service.recommend(user, MediaType::Movie).await.unwrap();

        assert_eq!(result.strategy, Strategy::Ai);
        assert_eq!(result.items.len(), 14);
        let unique: HashSet<i64> = result.items.iter().map(|c| c.id).collect();
        assert_eq!(unique.len(), 14);
        assert!(!unique.contains(&SOURCE_ID));
    }

    #[tokio::test]
    async fn test_ai_requested_without_provider_uses_fallback() {
        let fx = fixture(catalog_with(bucketed_candidates()), None);
        let user = Uuid::new_v4();
        watch_source(&fx.store, user).await;
        enable_ai(&fx.store, user).await;

        let result = fx.service.recommend(user, MediaType::Movie).await.unwrap();

        assert_eq!(result.strategy, Strategy::AiFallback);
        assert_eq!(result.items.len(), 14);
    }

    #[tokio::test]
    async fn test_zero_watched_yields_empty_for_both_strategies() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_recommendations().never();
        let mut similarity = MockSimilarityProvider::new();
        similarity.expect_similarities().never();

        let fx = fixture(catalog, Some(similarity));
        let user = Uuid::new_v4();

        let heuristic = fx.service.recommend(user, MediaType::Tv).await.unwrap();
        assert_eq!(heuristic.strategy, Strategy::Heuristic);
        assert!(heuristic.items.is_empty());

        enable_ai(&fx.store, user).await;
        let ai = fx.service.recommend(user, MediaType::Tv).await.unwrap();
        assert_eq!(ai.strategy, Strategy::Ai);
        assert!(ai.items.is_empty());
    }

    #[tokio::test]
    async fn test_marking_watched_excludes_from_next_run() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog.expect_recommendations().returning(|_, id| {
            Ok(if id == SOURCE_ID {
                vec![candidate(100, 7.0, 10.0, 60), candidate(101, 7.0, 10.0, 60), candidate(102, 7.0, 10.0, 60)]
            } else {
                vec![candidate(101, 7.0, 10.0, 60), candidate(103, 7.0, 10.0, 60)]
            })
        });
        catalog.expect_genres().returning(|_| Ok(HashMap::new()));
        catalog
            .expect_details()
            .returning(|media_type, id| Ok(details(media_type, id)));

        let fx = fixture(catalog, None);
        let user = Uuid::new_v4();
        watch_source(&fx.store, user).await;

        let ids = |items: &[CandidateContent]| -> HashSet<i64> { items.iter().map(|c| c.id).collect() };

        let before = fx.service.recommend(user, MediaType::Movie).await.unwrap();
        assert_eq!(ids(&before.items), HashSet::from([100, 101, 102]));

        fx.service
            .history
            .mark_watched(user, MediaType::Movie, 100)
            .await
            .unwrap();

        let after = fx.service.recommend(user, MediaType::Movie).await.unwrap();
        assert_eq!(ids(&after.items), HashSet::from([101, 102, 103]));
    }

    #[tokio::test]
    async fn test_recommend_updates_genre_snapshot() {
        let fx = fixture(catalog_with(bucketed_candidates()), None);
        let user = Uuid::new_v4();
        watch_source(&fx.store, user).await;

        fx.service.recommend(user, MediaType::Movie).await.unwrap();

        let prefs = fx.store.get_preferences(user).await.unwrap().unwrap();
        assert_eq!(prefs.genre_stats.len(), 1);
        assert!((prefs.genre_stats[&18].percentage - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_language_setting_filters_candidates() {
        let mut mixed = bucketed_candidates();
        for c in mixed.iter_mut().filter(|c| c.id % 2 == 0) {
            c.original_language = Some("ko".to_string());
        }
        let fx = fixture(catalog_with(mixed), None);
        let user = Uuid::new_v4();
        watch_source(&fx.store, user).await;
        fx.store
            .upsert_settings(
                user,
                &UserSettings {
                    ai_enabled: false,
                    original_language: Some("ko".to_string()),
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let result = fx.service.recommend(user, MediaType::Movie).await.unwrap();

        assert!(!result.items.is_empty());
        assert!(result
            .items
            .iter()
            .all(|c| c.original_language.as_deref() == Some("ko")));
    }
}
