use crate::auth::AuthProvider;
use crate::store::CanvasStore;
use brain_core::{Error, Result, UserId};
use std::sync::Arc;

/// Backend handles for one client session, passed explicitly to the
/// persistence adapter and the collection manager.
#[derive(Clone)]
pub struct SessionContext {
    pub store: Arc<dyn CanvasStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn CanvasStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    /// The signed-in user, or `Error::Auth`.
    pub fn require_user(&self) -> Result<UserId> {
        self.auth.current_user().ok_or(Error::Auth)
    }
}
