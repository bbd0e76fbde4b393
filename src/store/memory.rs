// src/store/memory.rs
//! Process-local backend used by tests and by database-less runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::{PollStore, UserStore};
use crate::error::{AppError, Entity};
use crate::models::{Poll, PollId, PollOption, User, UserId};
use crate::poll::NewPoll;
use crate::vote::OptionIndex;

#[derive(Default)]
struct Users {
    by_id: HashMap<UserId, User>,
    by_name: HashMap<String, UserId>,
}

#[derive(Default)]
struct Polls {
    // Each poll has its own lock so votes on different polls don't contend.
    by_id: HashMap<PollId, Arc<Mutex<Poll>>>,
    order: Vec<PollId>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Users>,
    polls: RwLock<Polls>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poll_entry(&self, id: PollId) -> Result<Arc<Mutex<Poll>>, AppError> {
        self.polls
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound(Entity::Poll))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.users.write();
        if users.by_name.contains_key(username) {
            return Err(AppError::DuplicateIdentifier);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.by_name.insert(user.username.clone(), user.id);
        users.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read();
        let user = users
            .by_name
            .get(username)
            .and_then(|id| users.by_id.get(id))
            .cloned();
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.users.read().by_id.get(&id).cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, AppError> {
        let mut users = self.users.write();
        match users.by_id.remove(&id) {
            Some(user) => {
                users.by_name.remove(&user.username);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, AppError> {
        let poll = Poll {
            id: Uuid::new_v4(),
            question: poll.question().to_string(),
            options: poll
                .labels()
                .iter()
                .map(|label| PollOption {
                    label: label.clone(),
                    votes: 0,
                })
                .collect(),
            created_at: Utc::now(),
        };

        let mut polls = self.polls.write();
        polls.order.push(poll.id);
        polls.by_id.insert(poll.id, Arc::new(Mutex::new(poll.clone())));
        Ok(poll)
    }

    async fn list_polls(&self) -> Result<Vec<Poll>, AppError> {
        let polls = self.polls.read();
        let snapshot = polls
            .order
            .iter()
            .filter_map(|id| polls.by_id.get(id))
            .map(|entry| entry.lock().clone())
            .collect();
        Ok(snapshot)
    }

    async fn get_poll(&self, id: PollId) -> Result<Poll, AppError> {
        let entry = self.poll_entry(id)?;
        let poll = entry.lock().clone();
        Ok(poll)
    }

    async fn increment_vote(&self, id: PollId, index: OptionIndex) -> Result<Poll, AppError> {
        let entry = self.poll_entry(id)?;
        let mut poll = entry.lock();
        let option = poll
            .options
            .get_mut(index.get())
            .ok_or(AppError::InvalidOptionIndex)?;
        option.votes += 1;
        Ok(poll.clone())
    }
}
