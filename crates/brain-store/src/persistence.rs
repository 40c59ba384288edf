//! Persistence adapter: graph ↔ storage row, plus change subscriptions.
//!
//! Saves are last-write-wins with no merge. Remote changes arrive as bare
//! invalidation signals; consumers re-fetch.

use crate::context::SessionContext;
use crate::store::ChangeEvent;
use brain_core::record::{CanvasRow, decode_graph, encode_graph};
use brain_core::{Canvas, CanvasId, EntityKind, Error, Graph, PersistenceError, Result, UserId};
use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct CanvasPersistence {
    ctx: SessionContext,
}

impl CanvasPersistence {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Write `graph` as the payload of canvas `id`. Returns the stored
    /// `updated_at`. The in-memory model is never touched, so a failed
    /// save leaves it exactly as it was.
    pub async fn save(&self, id: CanvasId, graph: &Graph) -> Result<DateTime<Utc>> {
        let data = encode_graph(graph)?;
        log::debug!(
            "saving canvas {id} ({} nodes, {} edges)",
            graph.nodes.len(),
            graph.edges.len()
        );
        self.ctx
            .store
            .update_data(id, data)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Canvas, id))
    }

    pub async fn load(&self, id: CanvasId) -> Result<Graph> {
        let row = self.fetch_row(id).await?;
        let graph = decode_graph(row.data)?;
        log::debug!("loaded canvas {id} ({} nodes)", graph.nodes.len());
        Ok(graph)
    }

    /// Load the full canvas record (name, owner, timestamps and graph).
    pub async fn load_canvas(&self, id: CanvasId) -> Result<Canvas> {
        Ok(self.fetch_row(id).await?.into_canvas()?)
    }

    async fn fetch_row(&self, id: CanvasId) -> Result<CanvasRow> {
        self.ctx
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Canvas, id))
    }

    /// Invoke `on_change` whenever a canvas owned by the signed-in user is
    /// inserted, updated or deleted. Must be called inside a Tokio runtime.
    ///
    /// The listener runs until the returned handle is dropped or
    /// unsubscribed.
    pub fn subscribe_to_changes<F>(&self, on_change: F) -> Result<ChangeSubscription>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_with(move || {
            on_change();
            std::future::ready(())
        })
    }

    /// Like `subscribe_to_changes`, but awaits each `on_change` future on the
    /// listener task. Reactions never overlap and end with the subscription.
    pub fn subscribe_with<F, Fut>(&self, on_change: F) -> Result<ChangeSubscription>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| PersistenceError::Transport(format!("no async runtime: {e}")))?;
        let mut rx = self.ctx.store.changes();
        let auth = self.ctx.auth.clone();

        let task = runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if concerns_user(&event, auth.current_user().as_ref()) {
                            on_change().await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("change listener lagged by {skipped} events");
                        on_change().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            log::debug!("change channel closed");
        });
        Ok(ChangeSubscription { task })
    }
}

fn concerns_user(event: &ChangeEvent, user: Option<&UserId>) -> bool {
    user.is_some_and(|u| *u == event.user_id)
}

/// A live change subscription. Dropping it stops the listener.
#[must_use = "the subscription ends when this handle is dropped"]
#[derive(Debug)]
pub struct ChangeSubscription {
    task: JoinHandle<()>,
}

impl ChangeSubscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
