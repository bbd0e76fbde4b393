// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::render::{JsonRenderer, Render};
use crate::session::SessionManager;
use crate::store::{MemoryStore, PollStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub polls: Arc<dyn PollStore>,
    pub credentials: Arc<CredentialStore>,
    pub sessions: Arc<SessionManager>,
    pub renderer: Arc<dyn Render>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        polls: Arc<dyn PollStore>,
        renderer: Arc<dyn Render>,
    ) -> Self {
        Self {
            polls,
            credentials: Arc::new(CredentialStore::new(users.clone())),
            sessions: Arc::new(SessionManager::new(config.session_ttl, users)),
            renderer,
            config: Arc::new(config),
        }
    }

    /// Both stores backed by one fresh `MemoryStore`, JSON rendering.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store, Arc::new(JsonRenderer))
    }
}
