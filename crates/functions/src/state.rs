//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::CharacterRepository;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// character repository.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    repository: Arc<dyn CharacterRepository>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `repository` - Character storage backend
    #[must_use]
    pub fn new(repository: Arc<dyn CharacterRepository>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { repository }),
        }
    }

    /// Get a reference to the character repository.
    #[must_use]
    pub fn repository(&self) -> &dyn CharacterRepository {
        self.inner.repository.as_ref()
    }
}
