// Password hashing and verification

use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Password task failed: {0}")]
    Join(String),
}

/// Hash a password with bcrypt at the configured cost.
///
/// bcrypt is CPU-bound, so the work runs on the blocking thread pool.
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_string();
    let cost = config::config().security.bcrypt_cost;

    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| PasswordError::Join(e.to_string()))?
}

/// Check a password against a stored bcrypt hash
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).map_err(|e| PasswordError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| PasswordError::Join(e.to_string()))?
}
