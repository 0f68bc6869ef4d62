//! Application state management

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::session::DocumentSession;

/// One loaded document; a single request mutates it at a time
pub type SharedSession = Arc<Mutex<DocumentSession>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Register a session under a new id
    pub async fn insert(&self, session: DocumentSession) -> String {
        let id = Uuid::new_v4().to_string();
        self.inner
            .sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        id
    }

    /// Look up a session by id
    pub async fn session(&self, id: &str) -> Result<SharedSession> {
        self.inner
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", id)))
    }

    /// Drop a session; `false` if it did not exist
    pub async fn remove(&self, id: &str) -> bool {
        self.inner.sessions.write().await.remove(id).is_some()
    }

    /// Number of loaded documents
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}
