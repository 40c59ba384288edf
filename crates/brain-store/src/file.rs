//! File-backed backend: one JSON document per canvas under a root directory.
//!
//! ```text
//! <root>/
//!   1b4e28ba-2fa1-11d2-883f-0016d3cca427.json
//!   6fa459ea-ee8a-3ca4-894e-db77e160355e.json
//! ```
//!
//! Writes go to a sibling temp file and are renamed into place. Change
//! notifications cover writes made through this handle only.

use crate::store::{
    CHANGE_CHANNEL_CAPACITY, CanvasStore, ChangeEvent, ChangeKind, StoreResult, announce,
    sort_by_recency,
};
use async_trait::async_trait;
use brain_core::record::CanvasRow;
use brain_core::{CanvasId, CanvasSummary, PersistenceError, UserId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

pub struct FileStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
    tx: broadcast::Sender<ChangeEvent>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        log::debug!("file store at {}", root.display());
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            tx,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: CanvasId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn read_row(&self, path: &Path) -> StoreResult<Option<CanvasRow>> {
        match fs::read(path).await {
            Ok(bytes) => {
                let row = serde_json::from_slice(&bytes).map_err(|e| {
                    PersistenceError::Malformed(format!("{}: {e}", path.display()))
                })?;
                Ok(Some(row))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_row(&self, row: &CanvasRow) -> StoreResult<()> {
        let path = self.path_for(row.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(row)?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Apply `edit` to a stored row and write it back.
    async fn modify(
        &self,
        id: CanvasId,
        edit: impl FnOnce(&mut CanvasRow) + Send,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut row) = self.read_row(&self.path_for(id)).await? else {
            return Ok(None);
        };
        edit(&mut row);
        row.updated_at = Utc::now().max(row.updated_at);
        self.write_row(&row).await?;
        let stamp = row.updated_at;
        announce(
            &self.tx,
            ChangeEvent {
                kind: ChangeKind::Update,
                canvas_id: id,
                user_id: row.user_id,
            },
        );
        Ok(Some(stamp))
    }
}

/// Canvas files are named by their uuid; anything else in the directory is ignored.
fn is_canvas_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| Uuid::parse_str(stem).is_ok())
}

#[async_trait]
impl CanvasStore for FileStore {
    async fn list(&self, owner: &UserId) -> StoreResult<Vec<CanvasSummary>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_canvas_file(&path) {
                continue;
            }
            match self.read_row(&path).await {
                Ok(Some(row)) if &row.user_id == owner => summaries.push(row.summary()),
                Ok(_) => {}
                Err(err) => log::warn!("skipping unreadable canvas file: {err}"),
            }
        }
        sort_by_recency(&mut summaries);
        Ok(summaries)
    }

    async fn fetch(&self, id: CanvasId) -> StoreResult<Option<CanvasRow>> {
        self.read_row(&self.path_for(id)).await
    }

    async fn insert(&self, mut row: CanvasRow) -> StoreResult<DateTime<Utc>> {
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(self.path_for(row.id)).await? {
            return Err(PersistenceError::Transport(format!(
                "canvas {} already exists",
                row.id
            )));
        }
        let stamp = Utc::now();
        row.created_at = stamp;
        row.updated_at = stamp;
        self.write_row(&row).await?;
        announce(
            &self.tx,
            ChangeEvent {
                kind: ChangeKind::Insert,
                canvas_id: row.id,
                user_id: row.user_id,
            },
        );
        Ok(stamp)
    }

    async fn update_data(&self, id: CanvasId, data: Value) -> StoreResult<Option<DateTime<Utc>>> {
        self.modify(id, move |row| row.data = data).await
    }

    async fn rename(&self, id: CanvasId, name: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let name = name.to_string();
        self.modify(id, move |row| row.name = name).await
    }

    async fn delete(&self, id: CanvasId) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(id);
        let Some(row) = self.read_row(&path).await? else {
            return Ok(false);
        };
        fs::remove_file(&path).await?;
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

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(owner: &str, name: &str) -> CanvasRow {
        let now = Utc::now();
        CanvasRow {
            id: CanvasId::new(),
            user_id: UserId::new(owner),
            name: name.to_string(),
            data: json!({"version": 1, "nodes": [], "edges": []}),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let r = row("ada", "Sprint Plan");
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.insert(r.clone()).await.unwrap();
            store.rename(r.id, "Sprint Plan v2").await.unwrap();
        }
        let store = FileStore::open(dir.path()).await.unwrap();
        let fetched = store.fetch(r.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Sprint Plan v2");
        assert_eq!(fetched.data, r.data);
    }

    #[tokio::test]
    async fn stray_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join(format!("{}.json", Uuid::new_v4())), "{broken").unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.insert(row("ada", "real")).await.unwrap();

        let listed = store.list(&UserId::new("ada")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "real");
    }

    #[tokio::test]
    async fn delete_removes_file_and_announces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let mut rx = store.changes();
        let r = row("ada", "gone");
        store.insert(r.clone()).await.unwrap();
        assert!(store.delete(r.id).await.unwrap());
        assert!(!store.path_for(r.id).exists());
        assert!(!store.delete(r.id).await.unwrap());

        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Insert);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Delete);
    }
}
