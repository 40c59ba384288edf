pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod record;
pub mod registry;

pub use document::{GraphDocument, GraphMutation, RemovedNode};
pub use error::{EntityKind, Error, PersistenceError, Result};
pub use id::{CanvasId, EdgeId, NodeId, UserId};
pub use model::*;
pub use registry::{NodePreview, VariantSpec, defaults_for, render_preview};
