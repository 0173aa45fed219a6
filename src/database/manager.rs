use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::auth::password::PasswordError;
use crate::config;

/// Errors raised by the data-access layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        DatabaseError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        DatabaseError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        DatabaseError::Unauthorized(message.into())
    }
}

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// True when the error is a unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some(UNIQUE_VIOLATION)
}

/// True when the error is a foreign-key violation
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some(FOREIGN_KEY_VIOLATION)
}

/// Name of the constraint a database error reports, if any
pub fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Builds the shared connection pool from configuration
pub struct DatabaseManager;

impl DatabaseManager {
    /// Database used whenever the service runs in the test environment
    const TEST_DB_NAME: &'static str = "jobly_test";

    /// Connect a new pool using the global configuration
    pub async fn connect() -> Result<PgPool, DatabaseError> {
        let connection_string = Self::connection_string()?;
        Self::connect_to(&connection_string).await
    }

    /// Connect a new pool to an explicit URL
    pub async fn connect_to(connection_string: &str) -> Result<PgPool, DatabaseError> {
        let settings = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            .connect(connection_string)
            .await?;

        info!("Created database pool for: {}", Self::redact(connection_string));
        Ok(pool)
    }

    /// Resolve the configured URL, pinning the database name in the test environment
    pub fn connection_string() -> Result<String, DatabaseError> {
        let base = &config::config().database.url;
        if base.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }

        if crate::is_test!() {
            Self::with_database_name(base, Self::TEST_DB_NAME)
        } else {
            Ok(base.clone())
        }
    }

    fn with_database_name(base: &str, database_name: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        // Replace the path to the database name (ensure leading slash)
        url.set_path(&format!("/{}", database_name));
        Ok(url.into())
    }

    fn redact(connection_string: &str) -> String {
        match url::Url::parse(connection_string) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.into()
            }
            Err(_) => "<unparseable url>".to_string(),
        }
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
