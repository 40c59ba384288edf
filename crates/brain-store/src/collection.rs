//! Canvas collection manager: the signed-in user's canvases and which one
//! is loaded.
//!
//! The cached summary list is refreshed in full whenever the backend
//! reports a change to one of the user's canvases, which keeps several
//! open clients consistent with each other. A list fetched before a local
//! change finished is discarded and fetched again.

use crate::context::SessionContext;
use crate::persistence::{CanvasPersistence, ChangeSubscription};
use crate::store::sort_by_recency;
use brain_core::record::{CanvasRow, encode_graph};
use brain_core::{
    Canvas, CanvasId, CanvasSummary, EntityKind, Error, Graph, GraphDocument, Result, UserId,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

#[derive(Debug, Default)]
struct CollectionState {
    summaries: Vec<CanvasSummary>,
    current: Option<CanvasId>,
    /// Bumped by every local change to `summaries` or `current`.
    generation: u64,
}

impl CollectionState {
    fn bump(&mut self) {
        self.generation += 1;
    }
}

fn lock(state: &Mutex<CollectionState>) -> MutexGuard<'_, CollectionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The current canvas's content at one revision, captured for saving.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub canvas: CanvasId,
    pub revision: u64,
    graph: Graph,
}

impl PendingSave {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// A completed save. Apply it to the document the snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "apply the receipt to clear the document's dirty flag"]
pub struct SaveReceipt {
    pub canvas: CanvasId,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl SaveReceipt {
    /// Mark `doc` clean if it has not changed since the snapshot was taken.
    pub fn apply(&self, doc: &mut GraphDocument) -> bool {
        let clean = doc.mark_saved(self.revision);
        if !clean {
            log::debug!("canvas {} changed during save; still dirty", self.canvas);
        }
        clean
    }
}

pub struct CanvasCollection {
    ctx: SessionContext,
    persistence: CanvasPersistence,
    state: Arc<Mutex<CollectionState>>,
    /// Bumped after every background refresh.
    refreshes: watch::Receiver<u64>,
    _subscription: ChangeSubscription,
}

impl CanvasCollection {
    /// Build the manager and start listening for remote changes. Must be
    /// called inside a Tokio runtime.
    ///
    /// Background refreshes run on the subscription's task, so they stop
    /// when the collection is dropped.
    pub fn new(ctx: SessionContext) -> Result<Self> {
        let persistence = CanvasPersistence::new(ctx.clone());
        let state = Arc::new(Mutex::new(CollectionState::default()));
        let (refresh_tx, refreshes) = watch::channel(0u64);
        let refresh_tx = Arc::new(refresh_tx);

        let subscription = {
            let ctx = ctx.clone();
            let state = state.clone();
            persistence.subscribe_with(move || {
                let ctx = ctx.clone();
                let state = state.clone();
                let refresh_tx = refresh_tx.clone();
                async move {
                    loop {
                        match refresh(&ctx, &state).await {
                            Ok(true) => break,
                            Ok(false) => continue,
                            Err(err) => {
                                log::warn!("canvas list refresh failed: {err}");
                                break;
                            }
                        }
                    }
                    refresh_tx.send_modify(|n| *n += 1);
                }
            })?
        };

        Ok(Self {
            ctx,
            persistence,
            state,
            refreshes,
            _subscription: subscription,
        })
    }

    pub fn persistence(&self) -> &CanvasPersistence {
        &self.persistence
    }

    /// Observe background refreshes; the value counts completed refreshes.
    pub fn refreshes(&self) -> watch::Receiver<u64> {
        self.refreshes.clone()
    }

    /// Fetch the user's canvases, most recently updated first.
    pub async fn list(&self) -> Result<Vec<CanvasSummary>> {
        refresh(&self.ctx, &self.state).await?;
        Ok(self.summaries())
    }

    /// The cached list as of the last fetch.
    pub fn summaries(&self) -> Vec<CanvasSummary> {
        lock(&self.state).summaries.clone()
    }

    /// The canvas loaded into the editing session, if any.
    pub fn current(&self) -> Option<CanvasId> {
        lock(&self.state).current
    }

    /// Create an empty canvas and put it at the head of the list.
    pub async fn create(&self, name: &str) -> Result<Canvas> {
        let user = self.ctx.require_user()?;
        let name = clean_name(name)?;
        let graph = Graph::new();
        let now = Utc::now();
        let mut row = CanvasRow {
            id: CanvasId::new(),
            user_id: user,
            name,
            data: encode_graph(&graph)?,
            created_at: now,
            updated_at: now,
        };
        let stamp = self.ctx.store.insert(row.clone()).await?;
        row.created_at = stamp;
        row.updated_at = stamp;
        log::debug!("created canvas {} ({:?})", row.id, row.name);

        let summary = row.summary();
        {
            let mut state = lock(&self.state);
            state.summaries.retain(|s| s.id != summary.id);
            state.summaries.insert(0, summary);
            state.bump();
        }
        Ok(Canvas {
            id: row.id,
            owner: row.user_id,
            name: row.name,
            graph,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    pub async fn rename(&self, id: CanvasId, name: &str) -> Result<()> {
        let user = self.ctx.require_user()?;
        let name = clean_name(name)?;
        self.ensure_owned(id, &user).await?;
        let stamp = self
            .ctx
            .store
            .rename(id, &name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Canvas, id))?;

        let mut state = lock(&self.state);
        if let Some(entry) = state.summaries.iter_mut().find(|s| s.id == id) {
            entry.name = name;
            entry.updated_at = stamp;
        }
        sort_by_recency(&mut state.summaries);
        state.bump();
        Ok(())
    }

    /// Permanently delete a canvas. Deleting the current canvas unloads it.
    pub async fn delete(&self, id: CanvasId) -> Result<()> {
        let user = self.ctx.require_user()?;
        self.ensure_owned(id, &user).await?;
        if !self.ctx.store.delete(id).await? {
            return Err(Error::not_found(EntityKind::Canvas, id));
        }
        log::debug!("deleted canvas {id}");

        let mut state = lock(&self.state);
        state.summaries.retain(|s| s.id != id);
        if state.current == Some(id) {
            state.current = None;
        }
        state.bump();
        Ok(())
    }

    /// Load canvas `id` into `doc` and make it current. On failure `doc`
    /// and the current selection are left as they were.
    pub async fn select(&self, id: CanvasId, doc: &mut GraphDocument) -> Result<CanvasSummary> {
        let user = self.ctx.require_user()?;
        let canvas = self.persistence.load_canvas(id).await?;
        if canvas.owner != user {
            return Err(Error::not_found(EntityKind::Canvas, id));
        }
        let summary = canvas.summary();
        doc.replace_graph(canvas.graph);
        let mut state = lock(&self.state);
        state.current = Some(id);
        state.bump();
        Ok(summary)
    }

    /// Capture `doc` for saving to the current canvas. The document is not
    /// borrowed while the save runs, so editing can continue.
    pub fn capture_current(&self, doc: &GraphDocument) -> Result<PendingSave> {
        let canvas = self
            .current()
            .ok_or_else(|| Error::validation("no canvas is selected"))?;
        Ok(PendingSave {
            canvas,
            revision: doc.revision(),
            graph: doc.snapshot(),
        })
    }

    /// Write a captured snapshot. Last write wins.
    pub async fn save(&self, pending: PendingSave) -> Result<SaveReceipt> {
        let PendingSave {
            canvas,
            revision,
            graph,
        } = pending;
        let updated_at = self.persistence.save(canvas, &graph).await?;

        let mut state = lock(&self.state);
        if let Some(entry) = state.summaries.iter_mut().find(|s| s.id == canvas) {
            entry.updated_at = updated_at;
        }
        sort_by_recency(&mut state.summaries);
        state.bump();
        Ok(SaveReceipt {
            canvas,
            revision,
            updated_at,
        })
    }

    async fn ensure_owned(&self, id: CanvasId, user: &UserId) -> Result<()> {
        match self.ctx.store.fetch(id).await? {
            Some(row) if &row.user_id == user => Ok(()),
            _ => Err(Error::not_found(EntityKind::Canvas, id)),
        }
    }
}

/// Replace the cached list with a fresh fetch. Returns `false` without
/// touching the cache when a local change landed while the fetch was out.
async fn refresh(ctx: &SessionContext, state: &Mutex<CollectionState>) -> Result<bool> {
    let user = ctx.require_user()?;
    let generation = lock(state).generation;
    let summaries = ctx.store.list(&user).await?;

    let mut state = lock(state);
    if state.generation != generation {
        log::debug!("discarding canvas list fetched before a local change");
        return Ok(false);
    }
    if let Some(current) = state.current
        && !summaries.iter().any(|s| s.id == current)
    {
        log::debug!("current canvas {current} no longer exists");
        state.current = None;
    }
    state.summaries = summaries;
    Ok(true)
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        Err(Error::validation("canvas name must not be empty"))
    } else {
        Ok(name.to_string())
    }
}
