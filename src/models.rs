// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type PollId = Uuid;

/// A registered account. The hash is a PHC string and is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOption {
    pub label: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreatePollForm {
    pub question: String,
    pub options: String,
}

/// Kept as raw text so a non-numeric selector becomes `InvalidOptionIndex`
/// instead of a form rejection.
#[derive(Deserialize)]
pub struct VoteForm {
    #[serde(rename = "optionIndex")]
    pub option_index: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}
