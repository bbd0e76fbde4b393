// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::gate::LOGIN_PATH;

/// Message shown for every credential failure, whichever half was wrong.
pub const CREDENTIALS_MESSAGE: &str = "incorrect username or password";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("identifier already registered")]
    DuplicateIdentifier,

    #[error("{0}")]
    NotFound(Entity),

    #[error("incorrect username or password")]
    BadSecret,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid option index")]
    InvalidOptionIndex,

    #[error("login required")]
    Unauthorized,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("hashing error: {0}")]
    Hashing(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Poll,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Same text as BadSecret so lookups can't be used to enumerate users.
            Entity::User => f.write_str(CREDENTIALS_MESSAGE),
            Entity::Poll => f.write_str("poll not found"),
        }
    }
}

impl AppError {
    /// True for the failures `verify` may produce on bad credentials.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, AppError::BadSecret | AppError::NotFound(Entity::User))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::NotFound(Entity::User) | AppError::BadSecret => StatusCode::UNAUTHORIZED,
            AppError::NotFound(Entity::Poll) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::InvalidOptionIndex => StatusCode::BAD_REQUEST,
            AppError::DuplicateIdentifier => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Hashing(_)
            | AppError::Config(_)
            | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
            }
        };

        (status, self.to_string()).into_response()
    }
}
