use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::Datastore,
    error::AppResult,
    models::{GenreStat, GenreStats, WatchedItem},
};

/// Counts every genre tag on every watched item.
///
/// Percentages are each genre's share of all tags, so they sum to 100
/// whenever at least one tag exists. No tags yields an empty map.
pub fn aggregate_genre_stats(watched: &[WatchedItem]) -> GenreStats {
    let mut stats = GenreStats::new();
    let mut total_tags: u32 = 0;

    for genre in watched.iter().flat_map(|item| item.genres.iter()) {
        let stat = stats.entry(genre.id).or_insert_with(|| GenreStat {
            genre_id: genre.id,
            name: genre.name.clone(),
            count: 0,
            percentage: 0.0,
        });
        stat.count += 1;
        total_tags += 1;
    }

    if total_tags > 0 {
        for stat in stats.values_mut() {
            stat.percentage = 100.0 * f64::from(stat.count) / f64::from(total_tags);
        }
    }

    stats
}

/// Stats ordered by share, largest first; ties by genre id
pub fn ranked_genres(stats: &GenreStats) -> Vec<GenreStat> {
    let mut ranked: Vec<GenreStat> = stats.values().cloned().collect();
    ranked.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then(a.genre_id.cmp(&b.genre_id))
    });
    ranked
}

/// Recomputes a user's genre statistics and stores them as the user's
/// preference snapshot.
///
/// Always a full recompute from `watched`. Concurrent analyses for the same
/// user are last-writer-wins.
pub async fn analyze_watch_history(
    store: &dyn Datastore,
    user_id: Uuid,
    watched: &[WatchedItem],
) -> AppResult<GenreStats> {
    let stats = aggregate_genre_stats(watched);

    store.upsert_genre_stats(user_id, &stats, Utc::now()).await?;

    tracing::info!(
        user_id = %user_id,
        watched = watched.len(),
        genres = stats.len(),
        "Genre statistics updated"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Genre, MediaType};

    fn item(content_id: i64, genres: &[(i64, &str)]) -> WatchedItem {
        WatchedItem {
            user_id: Uuid::nil(),
            content_id,
            media_type: MediaType::Movie,
            title: format!("Title {}", content_id),
            poster_path: None,
            vote_average: 7.0,
            overview: String::new(),
            genres: genres
                .iter()
                .map(|(id, name)| Genre {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_history_yields_empty_stats() {
        assert!(aggregate_genre_stats(&[]).is_empty());
    }

    #[test]
    fn test_items_without_genres_yield_empty_stats() {
        let watched = vec![item(1, &[]), item(2, &[])];
        assert!(aggregate_genre_stats(&watched).is_empty());
    }

    #[test]
    fn test_counts_and_percentages() {
        let watched = vec![
            item(1, &[(28, "Action"), (18, "Drama")]),
            item(2, &[(28, "Action")]),
            item(3, &[(28, "Action"), (35, "Comedy")]),
        ];

        let stats = aggregate_genre_stats(&watched);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[&28].count, 3);
        assert_eq!(stats[&28].name, "Action");
        assert!((stats[&28].percentage - 60.0).abs() < 1e-9);
        assert!((stats[&18].percentage - 20.0).abs() < 1e-9);
        assert!((stats[&35].percentage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let watched = vec![
            item(1, &[(28, "Action"), (18, "Drama"), (878, "Science Fiction")]),
            item(2, &[(18, "Drama")]),
            item(3, &[(35, "Comedy"), (10749, "Romance"), (18, "Drama")]),
            item(4, &[(27, "Horror")]),
            item(5, &[(53, "Thriller"), (27, "Horror"), (9648, "Mystery")]),
        ];

        let total: f64 = aggregate_genre_stats(&watched)
            .values()
            .map(|s| s.percentage)
            .sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_ranked_genres_order() {
        let watched = vec![
            item(1, &[(18, "Drama"), (35, "Comedy")]),
            item(2, &[(35, "Comedy")]),
            item(3, &[(80, "Crime")]),
        ];

        let ranked = ranked_genres(&aggregate_genre_stats(&watched));
        let ids: Vec<i64> = ranked.iter().map(|s| s.genre_id).collect();
        assert_eq!(ids, vec![35, 18, 80]);
    }

    #[tokio::test]
    async fn test_analyze_replaces_snapshot() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        analyze_watch_history(&store, user, &[item(1, &[(18, "Drama")])])
            .await
            .unwrap();
        analyze_watch_history(&store, user, &[item(2, &[(35, "Comedy")])])
            .await
            .unwrap();

        let prefs = store.get_preferences(user).await.unwrap().unwrap();
        assert_eq!(prefs.genre_stats.len(), 1);
        assert!(prefs.genre_stats.contains_key(&35));
    }

    #[tokio::test]
    async fn test_analyze_empty_history_stores_empty_snapshot() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let stats = analyze_watch_history(&store, user, &[]).await.unwrap();
        assert!(stats.is_empty());

        let prefs = store.get_preferences(user).await.unwrap().unwrap();
        assert!(prefs.genre_stats.is_empty());
    }
}
