use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    db::Datastore,
    error::{AppError, AppResult},
    models::{MediaType, NewWatchedItem, WatchedItem},
    services::providers::CatalogProvider,
};

type WatchKey = (Uuid, MediaType, i64);

/// Lifecycle of one watched item.
///
/// Removal is two-phase: an item first becomes `PendingDelete` and stays
/// restorable until `expires_at`, then the sweeper commits it to `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WatchState {
    Active,
    PendingDelete { expires_at: DateTime<Utc> },
    Deleted,
}

impl WatchState {
    /// Active -> PendingDelete. Repeating a removal keeps the first expiry.
    pub fn begin_delete(self, now: DateTime<Utc>, window: Duration) -> AppResult<Self> {
        match self {
            WatchState::Active => Ok(WatchState::PendingDelete {
                expires_at: now + window,
            }),
            WatchState::PendingDelete { .. } => Ok(self),
            WatchState::Deleted => Err(AppError::NotFound("Watched item not found".to_string())),
        }
    }

    /// PendingDelete -> Active, only while the undo window is open
    pub fn cancel_delete(self, now: DateTime<Utc>) -> AppResult<Self> {
        match self {
            WatchState::PendingDelete { expires_at } if now < expires_at => Ok(WatchState::Active),
            WatchState::PendingDelete { .. } => {
                Err(AppError::NotFound("Undo window has closed".to_string()))
            }
            WatchState::Active | WatchState::Deleted => {
                Err(AppError::NotFound("No pending removal for this item".to_string()))
            }
        }
    }

    /// PendingDelete -> Deleted once expired; any other state is unchanged
    pub fn commit(self, now: DateTime<Utc>) -> Self {
        match self {
            WatchState::PendingDelete { expires_at } if expires_at <= now => WatchState::Deleted,
            other => other,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, WatchState::Active)
    }
}

/// A user's watch history with undoable removal.
///
/// Rows stay in the store while pending; every read served here hides them.
/// Undo and commit both run under the `pending` lock, so for any item
/// exactly one of them takes effect.
pub struct WatchHistory {
    store: Arc<dyn Datastore>,
    catalog: Arc<dyn CatalogProvider>,
    pending: Mutex<HashMap<WatchKey, DateTime<Utc>>>,
    undo_window: Duration,
}

/// Handle for stopping the sweeper task
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper after it commits every outstanding removal
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Watch history sweeper task failed");
        }
        tracing::info!("Watch history sweeper stopped");
    }
}

impl WatchHistory {
    pub fn new(
        store: Arc<dyn Datastore>,
        catalog: Arc<dyn CatalogProvider>,
        undo_window: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            pending: Mutex::new(HashMap::new()),
            undo_window,
        }
    }

    /// Records a title as watched, filling its metadata from the catalog.
    ///
    /// Marking an item that is pending removal restores it instead.
    pub async fn mark_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<WatchedItem> {
        if content_id <= 0 {
            return Err(AppError::InvalidInput(
                "content_id must be a positive catalog id".to_string(),
            ));
        }

        let key = (user_id, media_type, content_id);
        {
            let mut pending = self.pending.lock().await;
            if pending.remove(&key).is_some() {
                if let Some(item) = self.store.find_watched(user_id, media_type, content_id).await? {
                    tracing::info!(
                        user_id = %user_id,
                        media_type = %media_type,
                        content_id,
                        "Pending removal cancelled by re-marking"
                    );
                    return Ok(item);
                }
            }
        }

        if self
            .store
            .find_watched(user_id, media_type, content_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Already marked as watched".to_string()));
        }

        let details = self.catalog.details(media_type, content_id).await?;
        let item = self
            .store
            .insert_watched(NewWatchedItem {
                user_id,
                content_id,
                media_type,
                title: details.title,
                poster_path: details.poster_path,
                vote_average: details.vote_average,
                overview: details.overview,
                genres: details.genres,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            media_type = %media_type,
            content_id,
            genres = item.genres.len(),
            "Marked as watched"
        );

        Ok(item)
    }

    /// Visible watched items, newest first
    pub async fn list_watched(&self, user_id: Uuid) -> AppResult<Vec<WatchedItem>> {
        let items = self.store.list_watched(user_id).await?;
        let pending = self.pending.lock().await;

        Ok(items
            .into_iter()
            .filter(|item| !pending.contains_key(&(user_id, item.media_type, item.content_id)))
            .collect())
    }

    pub async fn state(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<WatchState> {
        let pending = self.pending.lock().await;
        self.state_locked(&pending, (user_id, media_type, content_id))
            .await
    }

    pub async fn is_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<bool> {
        Ok(self
            .state(user_id, media_type, content_id)
            .await?
            .is_visible())
    }

    /// Starts the undo window for an item; returns when it closes
    pub async fn remove_watched(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<DateTime<Utc>> {
        let key = (user_id, media_type, content_id);
        let mut pending = self.pending.lock().await;

        let state = self
            .state_locked(&pending, key)
            .await?
            .begin_delete(Utc::now(), self.undo_window)?;

        match state {
            WatchState::PendingDelete { expires_at } => {
                pending.insert(key, expires_at);
                tracing::info!(
                    user_id = %user_id,
                    media_type = %media_type,
                    content_id,
                    expires_at = %expires_at,
                    "Watched item pending removal"
                );
                Ok(expires_at)
            }
            _ => Err(AppError::Internal(
                "Removal did not enter the pending state".to_string(),
            )),
        }
    }

    /// Restores an item whose undo window is still open
    pub async fn undo_remove(
        &self,
        user_id: Uuid,
        media_type: MediaType,
        content_id: i64,
    ) -> AppResult<WatchState> {
        let key = (user_id, media_type, content_id);
        let mut pending = self.pending.lock().await;

        let state = match pending.get(&key) {
            Some(expires_at) => WatchState::PendingDelete {
                expires_at: *expires_at,
            },
            None => WatchState::Active,
        };
        let restored = state.cancel_delete(Utc::now())?;
        pending.remove(&key);

        tracing::info!(
            user_id = %user_id,
            media_type = %media_type,
            content_id,
            "Removal undone"
        );

        Ok(restored)
    }

    /// Deletes every pending item whose window closed at or before `now`
    pub async fn commit_expired(&self, now: DateTime<Utc>) -> usize {
        self.commit_where(|state| state.commit(now) == WatchState::Deleted)
            .await
    }

    /// Deletes every pending item regardless of its window
    pub async fn commit_all(&self) -> usize {
        self.commit_where(|_| true).await
    }

    /// Runs `commit_expired` every `interval` until shut down.
    ///
    /// Shutdown commits whatever is still pending.
    pub fn spawn_sweeper(self: Arc<Self>, interval: std::time::Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Watch history sweeper started");
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.commit_expired(Utc::now()).await;
                    }
                    _ = shutdown_rx.recv() => {
                        let committed = self.commit_all().await;
                        tracing::info!(committed, "Sweeper flushed pending removals");
                        break;
                    }
                }
            }
        });

        SweeperHandle { shutdown_tx, task }
    }

    async fn commit_where<F>(&self, due: F) -> usize
    where
        F: Fn(WatchState) -> bool,
    {
        let mut pending = self.pending.lock().await;

        let keys: Vec<WatchKey> = pending
            .iter()
            .filter(|(_, expires_at)| {
                due(WatchState::PendingDelete {
                    expires_at: **expires_at,
                })
            })
            .map(|(key, _)| *key)
            .collect();

        let mut committed = 0;
        for (user_id, media_type, content_id) in keys {
            match self
                .store
                .delete_watched(user_id, media_type, content_id)
                .await
            {
                Ok(_) => {
                    pending.remove(&(user_id, media_type, content_id));
                    committed += 1;
                }
                Err(e) => {
                    // Left pending so the next sweep retries
                    tracing::error!(
                        user_id = %user_id,
                        media_type = %media_type,
                        content_id,
                        error = %e,
                        "Failed to commit watched item removal"
                    );
                }
            }
        }

        if committed > 0 {
            tracing::info!(committed, "Committed pending removals");
        }

        committed
    }

    async fn state_locked(
        &self,
        pending: &HashMap<WatchKey, DateTime<Utc>>,
        key: WatchKey,
    ) -> AppResult<WatchState> {
        if let Some(expires_at) = pending.get(&key) {
            return Ok(WatchState::PendingDelete {
                expires_at: *expires_at,
            });
        }

        let (user_id, media_type, content_id) = key;
        match self
            .store
            .find_watched(user_id, media_type, content_id)
            .await?
        {
            Some(_) => Ok(WatchState::Active),
            None => Ok(WatchState::Deleted),
        }
    }
}
