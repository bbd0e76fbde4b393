// src/store/postgres.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PollStore, UserStore};
use crate::error::{AppError, Entity};
use crate::models::{Poll, PollId, PollOption, User, UserId};
use crate::poll::NewPoll;
use crate::vote::OptionIndex;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PollRow {
    id: Uuid,
    question: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    poll_id: Uuid,
    label: String,
    votes: i64,
}

impl From<OptionRow> for PollOption {
    fn from(row: OptionRow) -> Self {
        PollOption {
            label: row.label,
            // CHECK (votes >= 0) in the schema
            votes: row.votes.max(0) as u64,
        }
    }
}

fn assemble(row: PollRow, options: Vec<OptionRow>) -> Poll {
    Poll {
        id: row.id,
        question: row.question,
        options: options.into_iter().map(PollOption::from).collect(),
        created_at: row.created_at,
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let inserted = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateIdentifier)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PollRow>(
            "INSERT INTO polls (id, question) VALUES ($1, $2) RETURNING id, question, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(poll.question())
        .fetch_one(&mut *tx)
        .await?;

        for (position, label) in poll.labels().iter().enumerate() {
            sqlx::query("INSERT INTO poll_options (poll_id, position, label) VALUES ($1, $2, $3)")
                .bind(row.id)
                .bind(position as i32)
                .bind(label)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let options = poll
            .labels()
            .iter()
            .map(|label| PollOption {
                label: label.clone(),
                votes: 0,
            })
            .collect();
        Ok(Poll {
            id: row.id,
            question: row.question,
            options,
            created_at: row.created_at,
        })
    }

    async fn list_polls(&self) -> Result<Vec<Poll>, AppError> {
        // Both reads share one snapshot.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let polls = sqlx::query_as::<_, PollRow>(
            "SELECT id, question, created_at FROM polls ORDER BY seq",
        )
        .fetch_all(&mut *tx)
        .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT poll_id, label, votes FROM poll_options ORDER BY poll_id, position",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut grouped: HashMap<Uuid, Vec<OptionRow>> = HashMap::new();
        for option in options {
            grouped.entry(option.poll_id).or_default().push(option);
        }

        Ok(polls
            .into_iter()
            .map(|row| {
                let options = grouped.remove(&row.id).unwrap_or_default();
                assemble(row, options)
            })
            .collect())
    }

    async fn get_poll(&self, id: PollId) -> Result<Poll, AppError> {
        let row = sqlx::query_as::<_, PollRow>(
            "SELECT id, question, created_at FROM polls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound(Entity::Poll))?;

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT poll_id, label, votes FROM poll_options WHERE poll_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(row, options))
    }

    async fn increment_vote(&self, id: PollId, index: OptionIndex) -> Result<Poll, AppError> {
        let position = i32::try_from(index.get()).map_err(|_| AppError::InvalidOptionIndex)?;

        // Single statement: the row lock makes read and write one step.
        let result = sqlx::query(
            "UPDATE poll_options SET votes = votes + 1 WHERE poll_id = $1 AND position = $2",
        )
        .bind(id)
        .bind(position)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Options never change after creation, so this check can't race the update.
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM polls WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return Err(match exists {
                Some(_) => AppError::InvalidOptionIndex,
                None => AppError::NotFound(Entity::Poll),
            });
        }

        self.get_poll(id).await
    }
}
