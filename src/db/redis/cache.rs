use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::MediaType;

const LIST_TTL_SECS: u64 = 60 * 60;
const RECOMMENDATION_TTL_SECS: u64 = 6 * 60 * 60;
const DETAIL_TTL_SECS: u64 = 24 * 60 * 60;
const GENRE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Most queued writes sent to Redis in one pipeline
const MAX_WRITE_BATCH: usize = 64;

/// Keys for cached catalog responses. Every key carries the locale because
/// catalog text (titles, overviews, genre names) is localized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Popular(MediaType, String),
    TopRated(MediaType, String),
    Details(MediaType, i64, String),
    Credits(MediaType, i64, String),
    Trailers(MediaType, i64, String),
    Recommendations(MediaType, i64, String),
    Genres(MediaType, String),
    Search(String, String),
}

impl CacheKey {
    /// Seconds a value under this key stays fresh
    pub fn ttl(&self) -> u64 {
        match self {
            CacheKey::Popular(..) | CacheKey::TopRated(..) | CacheKey::Search(..) => LIST_TTL_SECS,
            CacheKey::Recommendations(..) => RECOMMENDATION_TTL_SECS,
            CacheKey::Details(..) | CacheKey::Credits(..) | CacheKey::Trailers(..) => {
                DETAIL_TTL_SECS
            }
            CacheKey::Genres(..) => GENRE_TTL_SECS,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Popular(media, lang) => write!(f, "popular:{}:{}", media, lang),
            CacheKey::TopRated(media, lang) => write!(f, "top:{}:{}", media, lang),
            CacheKey::Details(media, id, lang) => write!(f, "detail:{}:{}:{}", media, id, lang),
            CacheKey::Credits(media, id, lang) => write!(f, "credits:{}:{}:{}", media, id, lang),
            CacheKey::Trailers(media, id, lang) => write!(f, "trailers:{}:{}:{}", media, id, lang),
            CacheKey::Recommendations(media, id, lang) => {
                write!(f, "rec:{}:{}:{}", media, id, lang)
            }
            CacheKey::Genres(media, lang) => write!(f, "genres:{}:{}", media, lang),
            CacheKey::Search(query, lang) => {
                write!(f, "search:{}:{}", query.trim().to_lowercase(), lang)
            }
        }
    }
}

/// Opens a Redis client; no connection is made until `Cache::new`
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// One queued `SET .. EX ..`
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache for catalog responses.
///
/// Reads go straight to Redis over a shared, self-reconnecting connection.
/// Writes are queued and flushed in pipelined batches by a background task,
/// so a response is never held up by a cache write.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Handle for stopping the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Stops the writer once every queued write has been flushed
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer
    pub async fn new(redis_client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(redis_client).await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::writer_task(conn.clone(), write_rx, shutdown_rx));

        Ok((Self { conn, write_tx }, CacheWriterHandle { shutdown_tx, task }))
    }

    async fn writer_task(
        mut conn: ConnectionManager,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer started");

        loop {
            tokio::select! {
                Some(first) = write_rx.recv() => {
                    let mut batch = vec![first];
                    while batch.len() < MAX_WRITE_BATCH {
                        match write_rx.try_recv() {
                            Ok(write) => batch.push(write),
                            Err(_) => break,
                        }
                    }
                    Self::flush(&mut conn, &batch).await;
                }
                _ = shutdown_rx.recv() => {
                    let mut remaining = Vec::new();
                    while let Ok(write) = write_rx.try_recv() {
                        remaining.push(write);
                    }
                    tracing::info!(pending = remaining.len(), "Cache writer flushing before shutdown");
                    for batch in remaining.chunks(MAX_WRITE_BATCH) {
                        Self::flush(&mut conn, batch).await;
                    }
                    break;
                }
            }
        }
    }

    async fn flush(conn: &mut ConnectionManager, batch: &[PendingWrite]) {
        let mut pipe = redis::pipe();
        for write in batch {
            pipe.set_ex(&write.key, &write.value, write.ttl).ignore();
        }

        let result: redis::RedisResult<()> = pipe.query_async(conn).await;
        if let Err(e) = result {
            tracing::error!(
                error = %e,
                writes = batch.len(),
                "Failed to write catalog responses to cache"
            );
        }
    }

    /// Retrieves and deserializes a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache entry {} is not valid JSON: {}", key, e))
                })
            })
            .transpose()
    }

    /// Queues a value for writing under the key's TTL
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl: key.ttl(),
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_popular() {
        let key = CacheKey::Popular(MediaType::Movie, "tr-TR".to_string());
        assert_eq!(key.to_string(), "popular:movie:tr-TR");
    }

    #[test]
    fn test_cache_key_display_recommendations() {
        let key = CacheKey::Recommendations(MediaType::Tv, 1396, "en-US".to_string());
        assert_eq!(key.to_string(), "rec:tv:1396:en-US");
    }

    #[test]
    fn test_cache_key_display_details() {
        let key = CacheKey::Details(MediaType::Movie, 27205, "tr-TR".to_string());
        assert_eq!(key.to_string(), "detail:movie:27205:tr-TR");
    }

    #[test]
    fn test_cache_key_display_search_normalized() {
        let key = CacheKey::Search("  THE Matrix ".to_string(), "tr-TR".to_string());
        assert_eq!(key.to_string(), "search:the matrix:tr-TR");
    }

    #[test]
    fn test_cache_key_locale_distinguishes() {
        let tr = CacheKey::Genres(MediaType::Movie, "tr-TR".to_string());
        let en = CacheKey::Genres(MediaType::Movie, "en-US".to_string());
        assert_ne!(tr.to_string(), en.to_string());
    }

    #[test]
    fn test_ttl_grows_with_stability() {
        let lang = || "tr-TR".to_string();
        let list = CacheKey::Popular(MediaType::Movie, lang()).ttl();
        let recs = CacheKey::Recommendations(MediaType::Movie, 1, lang()).ttl();
        let detail = CacheKey::Details(MediaType::Movie, 1, lang()).ttl();
        let genres = CacheKey::Genres(MediaType::Movie, lang()).ttl();

        assert!(list < recs && recs < detail && detail < genres);
        assert_eq!(CacheKey::Search("x".into(), lang()).ttl(), list);
    }

    // Requires a running Redis; run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await.unwrap();

        let key = CacheKey::Genres(MediaType::Tv, "test-LOCALE".to_string());
        let value = vec!["Drama".to_string(), "Comedy".to_string()];

        cache.set_in_background(&key, &value);
        handle.shutdown().await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
