// src/credentials.rs
//! Credential store: registration and password verification over a `UserStore`.
//!
//! Passwords are hashed with Argon2id into PHC strings (salt and parameters
//! embedded). Hashing runs on the blocking pool so it never stalls the runtime.

use std::sync::{Arc, OnceLock};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::info;

use crate::error::{AppError, Entity};
use crate::models::User;
use crate::store::UserStore;

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Hashing(format!("failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash. The digest comparison is
/// constant-time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Hashing(format!("invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    // Verified against when the username is unknown, to keep both failure paths equally slow.
    decoy_hash: OnceLock<String>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            decoy_hash: OnceLock::new(),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput("username and password are required".into()));
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::DuplicateIdentifier);
        }

        let password = password.to_string();
        let hash = blocking(move || hash_password(&password)).await?;

        // The store enforces uniqueness again, covering a concurrent registration.
        let user = self.users.insert_user(username, &hash).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// On failure returns `NotFound(User)` or `BadSecret`; both render the same
    /// message, so callers can't tell which half was wrong.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self.users.find_by_username(username).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.decoy_hash().await?,
        };
        let password = password.to_string();
        let matches = blocking(move || verify_password(&password, &hash)).await?;

        match user {
            Some(user) if matches => Ok(user),
            Some(_) => Err(AppError::BadSecret),
            None => Err(AppError::NotFound(Entity::User)),
        }
    }

    async fn decoy_hash(&self) -> Result<String, AppError> {
        if let Some(hash) = self.decoy_hash.get() {
            return Ok(hash.clone());
        }
        let hash = blocking(|| hash_password("decoy-password")).await?;
        Ok(self.decoy_hash.get_or_init(|| hash).clone())
    }
}
