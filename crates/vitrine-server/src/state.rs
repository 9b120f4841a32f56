use std::sync::Arc;

use vitrine_media::MediaLibrary;
use vitrine_storage::MediaBackend;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    /// Folder-oriented media operations over the active backend
    pub library: MediaLibrary,

    /// Admin token guarding mutation routes (None disables the check,
    /// for development)
    pub admin_token: Option<String>,
}

impl AppState {
    /// Create app state without authentication (for development)
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            library: MediaLibrary::new(backend),
            admin_token: None,
        }
    }

    /// Create app state with mutation routes guarded by a token
    pub fn new_with_token(backend: Arc<dyn MediaBackend>, admin_token: Option<String>) -> Self {
        Self {
            library: MediaLibrary::new(backend),
            admin_token,
        }
    }

    /// Check if authentication is enabled
    pub fn is_auth_enabled(&self) -> bool {
        self.admin_token.is_some()
    }
}
