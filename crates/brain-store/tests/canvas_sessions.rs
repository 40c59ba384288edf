//! Integration tests: canvas lifecycle through `CanvasCollection` and
//! `CanvasPersistence` against both backends.

use brain_core::model::*;
use brain_core::{Error, GraphDocument, PersistenceError, UserId};
use brain_store::{
    CanvasCollection, CanvasPersistence, CanvasStore, FileStore, MemoryStore, SessionAuth,
    SessionContext,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session(store: Arc<dyn CanvasStore>, user: &str) -> SessionContext {
    SessionContext::new(store, Arc::new(SessionAuth::signed_in(UserId::new(user))))
}

/// Save the current canvas and mark `doc` clean if it is unchanged.
async fn save(canvases: &CanvasCollection, doc: &mut GraphDocument) -> brain_core::Result<bool> {
    let pending = canvases.capture_current(doc)?;
    let receipt = canvases.save(pending).await?;
    Ok(receipt.apply(doc))
}

/// A task wired to a note, the way a user would sketch a plan.
fn sketch(doc: &mut GraphDocument) {
    let task = doc
        .add_node(
            NodeKind::Task,
            Point::new(100.0, 100.0),
            Some(NodeData::Task(TaskData {
                title: "Ship it".into(),
                priority: TaskPriority::High,
                ..Default::default()
            })),
        )
        .unwrap();
    let note = doc
        .add_node(NodeKind::Note, Point::new(400.0, 100.0), None)
        .unwrap();
    doc.add_edge(
        Endpoint::new(task.id, Port::Right),
        Endpoint::new(note.id, Port::Left),
    )
    .unwrap();
}

#[tokio::test]
async fn new_canvas_heads_the_list_with_an_empty_graph() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let canvases = CanvasCollection::new(session(store, "ada")).unwrap();
    canvases.create("Backlog").await.unwrap();
    let created = canvases.create("Sprint Plan").await.unwrap();

    let listed = canvases.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "Sprint Plan");
    assert_eq!(listed[0].id, created.id);

    let mut doc = GraphDocument::new();
    canvases.select(created.id, &mut doc).await.unwrap();
    assert_eq!(doc.snapshot(), Graph::new());
    assert!(!doc.is_dirty());
}

#[tokio::test]
async fn saved_graph_loads_back_unchanged() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let ctx = session(store, "ada");
    let canvases = CanvasCollection::new(ctx.clone()).unwrap();
    let canvas = canvases.create("Roadmap").await.unwrap();

    let mut doc = GraphDocument::new();
    canvases.select(canvas.id, &mut doc).await.unwrap();
    sketch(&mut doc);
    let saved = doc.snapshot();
    assert!(save(&canvases, &mut doc).await.unwrap());

    let loaded = CanvasPersistence::new(ctx).load(canvas.id).await.unwrap();
    assert_eq!(loaded, saved);

    let mut reopened = GraphDocument::new();
    canvases.select(canvas.id, &mut reopened).await.unwrap();
    assert_eq!(reopened.snapshot(), saved);
}

#[tokio::test]
async fn failed_save_keeps_edits_and_dirty_flag() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let canvases = CanvasCollection::new(session(store.clone(), "ada")).unwrap();
    let canvas = canvases.create("Offline").await.unwrap();

    let mut doc = GraphDocument::new();
    canvases.select(canvas.id, &mut doc).await.unwrap();
    sketch(&mut doc);
    let before = doc.snapshot();

    store.set_offline(true);
    let err = save(&canvases, &mut doc).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Persistence(PersistenceError::Transport(_))
    ));
    assert_eq!(doc.snapshot(), before);
    assert!(doc.is_dirty());

    store.set_offline(false);
    assert!(save(&canvases, &mut doc).await.unwrap());
    assert!(!doc.is_dirty());
}

#[tokio::test]
async fn changes_from_another_client_refresh_the_list() {
    init_logging();
    let store: Arc<dyn CanvasStore> = Arc::new(MemoryStore::new());
    let first = CanvasCollection::new(session(store.clone(), "ada")).unwrap();
    let second = CanvasCollection::new(session(store.clone(), "ada")).unwrap();
    let mut refreshed = second.refreshes();

    let canvas = first.create("Shared").await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), refreshed.changed())
        .await
        .unwrap()
        .unwrap();
    let seen = second.summaries();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, canvas.id);

    first.delete(canvas.id).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), refreshed.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(second.summaries().is_empty());
}

#[tokio::test]
async fn other_users_changes_do_not_refresh() {
    init_logging();
    let store: Arc<dyn CanvasStore> = Arc::new(MemoryStore::new());
    let ada = CanvasCollection::new(session(store.clone(), "ada")).unwrap();
    let grace = CanvasCollection::new(session(store.clone(), "grace")).unwrap();
    let refreshed = ada.refreshes();

    grace.create("Grace's board").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!refreshed.has_changed().unwrap());
    assert!(ada.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn file_backend_round_trips_across_reopen() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let saved;
    let id;
    {
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let canvases = CanvasCollection::new(session(store, "ada")).unwrap();
        let canvas = canvases.create("On disk").await.unwrap();
        id = canvas.id;
        let mut doc = GraphDocument::new();
        canvases.select(id, &mut doc).await.unwrap();
        sketch(&mut doc);
        saved = doc.snapshot();
        assert!(save(&canvases, &mut doc).await.unwrap());
    }

    let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let canvases = CanvasCollection::new(session(store, "ada")).unwrap();
    let listed = canvases.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "On disk");

    let mut doc = GraphDocument::new();
    canvases.select(id, &mut doc).await.unwrap();
    assert_eq!(doc.snapshot(), saved);
}
