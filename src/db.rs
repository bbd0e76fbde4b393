// src/db.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS polls (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        question TEXT NOT NULL CHECK (question <> ''),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS poll_options (
        poll_id UUID NOT NULL REFERENCES polls (id) ON DELETE CASCADE,
        position INTEGER NOT NULL CHECK (position >= 0),
        label TEXT NOT NULL,
        votes BIGINT NOT NULL DEFAULT 0 CHECK (votes >= 0),
        PRIMARY KEY (poll_id, position)
    )
    "#,
];

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Creates the tables if they don't exist yet. Safe to run on every start.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(tables = SCHEMA.len(), "schema ready");
    Ok(())
}
