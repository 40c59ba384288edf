//! In-process backend.

use crate::store::{
    CHANGE_CHANNEL_CAPACITY, CanvasStore, ChangeEvent, ChangeKind, StoreResult, announce,
    sort_by_recency,
};
use async_trait::async_trait;
use brain_core::record::CanvasRow;
use brain_core::{CanvasId, CanvasSummary, PersistenceError, UserId};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;

/// In-memory `CanvasStore` for tests and offline sessions.
///
/// `set_offline(true)` makes every call fail with a transport error, which
/// is how callers exercise their failure paths.
pub struct MemoryStore {
    rows: RwLock<HashMap<CanvasId, CanvasRow>>,
    offline: AtomicBool,
    /// Last timestamp handed out; stamps are strictly increasing.
    clock: Mutex<DateTime<Utc>>,
    tx: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            tx,
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current time, nudged forward so no two calls return the same instant.
    pub fn stamp(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().max(*last + Duration::microseconds(1));
        *last = now;
        now
    }

    fn online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(PersistenceError::Transport("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> PersistenceError {
    PersistenceError::Transport(format!("lock: {e}"))
}

#[async_trait]
impl CanvasStore for MemoryStore {
    async fn list(&self, owner: &UserId) -> StoreResult<Vec<CanvasSummary>> {
        self.online()?;
        let rows = self.rows.read().map_err(lock_err)?;
        let mut summaries: Vec<_> = rows
            .values()
            .filter(|row| &row.user_id == owner)
            .map(CanvasRow::summary)
            .collect();
        sort_by_recency(&mut summaries);
        Ok(summaries)
    }

    async fn fetch(&self, id: CanvasId) -> StoreResult<Option<CanvasRow>> {
        self.online()?;
        let rows = self.rows.read().map_err(lock_err)?;
        Ok(rows.get(&id).cloned())
    }

    async fn insert(&self, mut row: CanvasRow) -> StoreResult<DateTime<Utc>> {
        self.online()?;
        let stamp = self.stamp();
        row.created_at = stamp;
        row.updated_at = stamp;
        let event = ChangeEvent {
            kind: ChangeKind::Insert,
            canvas_id: row.id,
            user_id: row.user_id.clone(),
        };
        {
            let mut rows = self.rows.write().map_err(lock_err)?;
            if rows.contains_key(&row.id) {
                return Err(PersistenceError::Transport(format!(
                    "canvas {} already exists",
                    row.id
                )));
            }
            rows.insert(row.id, row);
        }
        announce(&self.tx, event);
        Ok(stamp)
    }

    async fn update_data(&self, id: CanvasId, data: Value) -> StoreResult<Option<DateTime<Utc>>> {
        self.online()?;
        let stamp = self.stamp();
        let owner = {
            let mut rows = self.rows.write().map_err(lock_err)?;
            let Some(row) = rows.get_mut(&id) else {
                return Ok(None);
            };
            row.data = data;
            row.updated_at = stamp;
            row.user_id.clone()
        };
        announce(
            &self.tx,
            ChangeEvent {
                kind: ChangeKind::Update,
                canvas_id: id,
                user_id: owner,
            },
        );
        Ok(Some(stamp))
    }

    async fn rename(&self, id: CanvasId, name: &str) -> StoreResult<Option<DateTime<Utc>>> {
        self.online()?;
        let stamp = self.stamp();
        let owner = {
            let mut rows = self.rows.write().map_err(lock_err)?;
            let Some(row) = rows.get_mut(&id) else {
                return Ok(None);
            };
            row.name = name.to_string();
            row.updated_at = stamp;
            row.user_id.clone()
        };
        announce(
            &self.tx,
            ChangeEvent {
                kind: ChangeKind::Update,
                canvas_id: id,
                user_id: owner,
            },
        );
        Ok(Some(stamp))
    }

    async fn delete(&self, id: CanvasId) -> StoreResult<bool> {
        self.online()?;
        let removed = self.rows.write().map_err(lock_err)?.remove(&id);
        match removed {
            Some(row) => {
                announce(
                    &self.tx,
                    ChangeEvent {
                        kind: ChangeKind::Delete,
                        canvas_id: id,
                        user_id: row.user_id,
                    },
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}
