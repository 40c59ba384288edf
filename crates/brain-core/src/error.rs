//! Error taxonomy shared by the document model, editor and persistence layer.
//!
//! Nothing here is fatal: every variant is recoverable by retrying the user
//! action or reloading the canvas.

use std::fmt;
use thiserror::Error;

/// What kind of entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Edge,
    Canvas,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
            EntityKind::Canvas => "canvas",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected mutation. The model is left unchanged.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Storage read/write failure. The in-memory model is not rolled back.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("no user is signed in")]
    Auth,
}

impl Error {
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Whether the UI should bounce the user to sign-in.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, Error::Auth)
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage transport failed: {0}")]
    Transport(String),

    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("canvas payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed canvas record: {0}")]
    Malformed(String),

    #[error("canvas payload version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        let err = Error::not_found(EntityKind::Edge, "edge-1");
        assert_eq!(err.to_string(), "edge not found: edge-1");
    }

    #[test]
    fn persistence_errors_convert() {
        let err: Error = PersistenceError::Transport("offline".into()).into();
        assert!(matches!(err, Error::Persistence(PersistenceError::Transport(_))));
        assert!(!err.requires_sign_in());
        assert!(Error::Auth.requires_sign_in());
    }
}
