// src/store/mod.rs
//! Persistence seams. Handlers and services only see these traits; the
//! backend is picked at startup and injected through `AppState`.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Poll, PollId, User, UserId};
use crate::poll::NewPoll;
use crate::vote::OptionIndex;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateIdentifier` if the username is taken; never overwrites.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Returns whether a record was removed.
    async fn delete_user(&self, id: UserId) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PollStore: Send + Sync {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, AppError>;

    /// Snapshot in insertion order.
    async fn list_polls(&self) -> Result<Vec<Poll>, AppError>;

    async fn get_poll(&self, id: PollId) -> Result<Poll, AppError>;

    /// Adds exactly one vote to the option at `index`. The read-modify-write
    /// must be atomic per option: concurrent increments are never lost.
    async fn increment_vote(&self, id: PollId, index: OptionIndex) -> Result<Poll, AppError>;
}
