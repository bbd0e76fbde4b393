// src/session.rs
//! Session manager: mints opaque tokens at login and maps them back to users.
//!
//! Sessions live in process memory and expire after a period of inactivity.
//! Resolution always fails closed: an unknown, expired, or orphaned token
//! (its user no longer exists) is treated as anonymous, never as an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::models::{User, UserId};
use crate::store::UserStore;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[derive(Debug)]
struct SessionEntry {
    user_id: UserId,
    last_seen: Instant,
}

pub struct SessionManager {
    ttl: Duration,
    users: Arc<dyn UserStore>,
    sessions: RwLock<HashMap<SessionToken, SessionEntry>>,
}

impl SessionManager {
    pub fn new(ttl: Duration, users: Arc<dyn UserStore>) -> Self {
        Self {
            ttl,
            users,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, user: &User) -> SessionToken {
        let token = SessionToken::generate();
        self.sessions.write().insert(
            token.clone(),
            SessionEntry {
                user_id: user.id,
                last_seen: Instant::now(),
            },
        );
        info!(user_id = %user.id, "session created");
        token
    }

    /// Returns the session's user, or `None` for anonymous.
    pub async fn resolve(&self, token: &SessionToken) -> Option<User> {
        let user_id = self.touch(token)?;

        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                debug!(%user_id, "session user no longer exists");
                self.destroy(token);
                None
            }
            Err(e) => {
                warn!(%user_id, error = %e, "session user lookup failed");
                None
            }
        }
    }

    /// Idempotent: unknown tokens are ignored.
    pub fn destroy(&self, token: &SessionToken) {
        if let Some(entry) = self.sessions.write().remove(token) {
            info!(user_id = %entry.user_id, "session destroyed");
        }
    }

    /// Drops every expired session and returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Refreshes the inactivity clock; expired entries are removed on sight.
    fn touch(&self, token: &SessionToken) -> Option<UserId> {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(token)?;
        if now.duration_since(entry.last_seen) >= self.ttl {
            sessions.remove(token);
            return None;
        }
        entry.last_seen = now;
        Some(entry.user_id)
    }
}
