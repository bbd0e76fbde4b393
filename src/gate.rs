// src/gate.rs
use tracing::info;

use crate::error::AppError;
use crate::models::User;

/// Where denied requests are sent.
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewPolls,
    Vote,
    CreatePoll,
}

impl Capability {
    pub fn requires_identity(self) -> bool {
        matches!(self, Capability::CreatePoll)
    }
}

/// Decides whether `identity` may exercise `capability`. Must be called before
/// any mutation; a denial becomes a redirect to [`LOGIN_PATH`].
pub fn authorize(identity: Option<&User>, capability: Capability) -> Result<(), AppError> {
    if !capability.requires_identity() || identity.is_some() {
        return Ok(());
    }
    info!(?capability, "anonymous request denied");
    Err(AppError::Unauthorized)
}
