//! Application state for Axum web framework.

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::store::{DynStore, FilmStore};

/// Shared state handed to every handler.
///
/// Cloning is cheap: the store sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The configured persistence backend
    pub store: DynStore,
    /// Credential settings, including the bootstrap admin
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Creates an AppState around any store backend.
    ///
    /// # Example
    /// ```ignore
    /// let state = AppState::new(PgStore::new(pool), settings.auth.clone());
    /// ```
    pub fn new(store: impl FilmStore + 'static, auth: AuthConfig) -> Self {
        Self::with_store(Arc::new(store), auth)
    }

    /// Creates an AppState around an already shared store.
    pub fn with_store(store: DynStore, auth: AuthConfig) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
        }
    }
}
