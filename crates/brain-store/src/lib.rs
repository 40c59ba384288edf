//! Canvas storage for Brain: backends, the graph persistence adapter and
//! the per-user canvas collection.

pub mod auth;
pub mod collection;
pub mod context;
pub mod file;
pub mod memory;
pub mod persistence;
pub mod store;

pub use auth::{AuthProvider, SessionAuth};
pub use collection::{CanvasCollection, PendingSave, SaveReceipt};
pub use context::SessionContext;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use persistence::{CanvasPersistence, ChangeSubscription};
pub use store::{CanvasStore, ChangeEvent, ChangeKind, StoreResult};
