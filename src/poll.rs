// src/poll.rs
use tracing::info;

use crate::error::AppError;
use crate::models::{Poll, PollId};
use crate::store::PollStore;

/// Delimiter between option labels in the creation form.
pub const OPTION_DELIMITER: char = ',';

/// A validated poll ready to be stored: trimmed, non-empty question and at
/// least one trimmed, non-empty label in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPoll {
    question: String,
    labels: Vec<String>,
}

impl NewPoll {
    pub fn new<I, S>(question: &str, labels: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".into()));
        }

        let labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if labels.is_empty() {
            return Err(AppError::InvalidInput("at least one option is required".into()));
        }

        Ok(Self {
            question: question.to_string(),
            labels,
        })
    }

    /// Parses the form payload, where options arrive as one delimited string.
    pub fn from_form(question: &str, options: &str) -> Result<Self, AppError> {
        Self::new(question, options.split(OPTION_DELIMITER))
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

pub async fn create_poll(store: &dyn PollStore, new_poll: NewPoll) -> Result<PollId, AppError> {
    let poll = store.insert_poll(new_poll).await?;
    info!(poll_id = %poll.id, options = poll.options.len(), "poll created");
    Ok(poll.id)
}

pub async fn list_polls(store: &dyn PollStore) -> Result<Vec<Poll>, AppError> {
    store.list_polls().await
}

pub async fn get_poll(store: &dyn PollStore, id: PollId) -> Result<Poll, AppError> {
    store.get_poll(id).await
}
