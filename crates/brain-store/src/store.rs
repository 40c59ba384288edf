//! Storage backend contract.
//!
//! A backend holds canvas rows with an opaque JSON payload and announces
//! every insert, update and delete on a broadcast channel. Payload
//! validation happens above this layer, in the persistence adapter.

use async_trait::async_trait;
use brain_core::record::CanvasRow;
use brain_core::{CanvasId, CanvasSummary, PersistenceError, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Capacity of each backend's change channel.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change notification. Consumers treat it as an invalidation
/// signal, not a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub canvas_id: CanvasId,
    pub user_id: UserId,
}

pub type StoreResult<T> = Result<T, PersistenceError>;

#[async_trait]
pub trait CanvasStore: Send + Sync {
    /// Summaries of every canvas owned by `owner`, most recently updated first.
    async fn list(&self, owner: &UserId) -> StoreResult<Vec<CanvasSummary>>;

    async fn fetch(&self, id: CanvasId) -> StoreResult<Option<CanvasRow>>;

    /// Store a new row. The backend stamps `created_at`/`updated_at` and
    /// returns the stamp.
    async fn insert(&self, row: CanvasRow) -> StoreResult<DateTime<Utc>>;

    /// Overwrite a canvas payload. Returns the new `updated_at`, or `None`
    /// if no such canvas exists.
    async fn update_data(&self, id: CanvasId, data: Value) -> StoreResult<Option<DateTime<Utc>>>;

    async fn rename(&self, id: CanvasId, name: &str) -> StoreResult<Option<DateTime<Utc>>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: CanvasId) -> StoreResult<bool>;

    /// A fresh receiver on this backend's change channel.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Sort summaries most recently updated first; ties fall back to creation time.
pub fn sort_by_recency(summaries: &mut [CanvasSummary]) {
    summaries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then(b.created_at.cmp(&a.created_at))
    });
}

/// Publish a change. A channel with no receivers is not an error.
pub(crate) fn announce(tx: &broadcast::Sender<ChangeEvent>, event: ChangeEvent) {
    log::trace!("{:?} canvas {}", event.kind, event.canvas_id);
    let _ = tx.send(event);
}
