use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::auth::password::{hash_password, verify_password};
use crate::database::manager::{is_unique_violation, DatabaseError};
use crate::database::sql::{self, sql_for_partial_update, ColumnMap, SqlResult};
use crate::validation::{Validate, ValidationErrors};

const USER_FIELDS: &str = "username, first_name, last_name, email, is_admin";

/// API field names that differ from their column
const USER_COLUMNS: ColumnMap = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("isAdmin", "is_admin"),
];

/// A user as exposed through the API; the password hash is never selected
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    /// Ids of jobs the user applied to
    pub applications: Vec<i32>,
}

#[derive(FromRow)]
struct StoredUser {
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    email: String,
    is_admin: bool,
}

impl From<StoredUser> for User {
    fn from(row: StoredUser) -> Self {
        Self {
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            is_admin: row.is_admin,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Self-registration payload; new accounts are never admins
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<Registration> for NewUser {
    fn from(r: Registration) -> Self {
        Self {
            username: r.username,
            password: r.password,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            is_admin: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

fn check_user_fields(
    errors: &mut ValidationErrors,
    first_name: Option<&str>,
    last_name: Option<&str>,
    password: Option<&str>,
    email: Option<&str>,
) {
    if let Some(v) = first_name {
        errors.length("firstName", v, 1, 30);
    }
    if let Some(v) = last_name {
        errors.length("lastName", v, 1, 30);
    }
    if let Some(v) = password {
        errors.length("password", v, 5, 20);
    }
    if let Some(v) = email {
        errors.length("email", v, 6, 60);
        errors.email("email", v);
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.length("username", &self.username, 1, 25);
        errors.check(!self.password.is_empty(), "password", "is required");
        errors.into_result()
    }
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.length("username", &self.username, 1, 25);
        check_user_fields(
            &mut errors,
            Some(&self.first_name),
            Some(&self.last_name),
            Some(&self.password),
            Some(&self.email),
        );
        errors.into_result()
    }
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), ValidationErrors> {
        NewUser::from(self.clone()).validate()
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_user_fields(
            &mut errors,
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.password.as_deref(),
            self.email.as_deref(),
        );
        errors.into_result()
    }
}

impl User {
    /// Check credentials; an unknown user and a wrong password look the same
    pub async fn authenticate(
        pool: &PgPool,
        username: &str,
        password: &str,
    ) -> Result<User, DatabaseError> {
        let stored = sqlx::query_as::<_, StoredUser>(
            "SELECT username, password, first_name, last_name, email, is_admin \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        if let Some(stored) = stored {
            if verify_password(password, &stored.password).await? {
                return Ok(stored.into());
            }
        }

        debug!("Rejected credentials for '{}'", username);
        Err(DatabaseError::unauthorized("Invalid username/password"))
    }

    /// Store a new user with a hashed password
    pub async fn register(pool: &PgPool, data: &NewUser) -> Result<User, DatabaseError> {
        let duplicate = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE username = $1")
            .bind(&data.username)
            .fetch_optional(pool)
            .await?;

        if duplicate.is_some() {
            return Err(DatabaseError::bad_request(format!("Duplicate username: {}", data.username)));
        }

        let hashed = hash_password(&data.password).await?;

        let sql = format!(
            "INSERT INTO users (username, password, first_name, last_name, email, is_admin) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_FIELDS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&data.username)
            .bind(&hashed)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(&data.email)
            .bind(data.is_admin)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::bad_request(format!("Duplicate username: {}", data.username))
                } else {
                    e.into()
                }
            })
    }

    /// All users ordered by username
    pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users ORDER BY username", USER_FIELDS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?)
    }

    /// A user with the ids of the jobs they applied to
    pub async fn get(pool: &PgPool, username: &str) -> Result<UserDetail, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_FIELDS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("No user: {}", username)))?;

        let applications = sqlx::query_scalar::<_, i32>(
            "SELECT job_id FROM applications WHERE username = $1 ORDER BY job_id",
        )
        .bind(username)
        .fetch_all(pool)
        .await?;

        Ok(UserDetail { user, applications })
    }

    /// Apply the supplied fields; a new password is hashed before storage
    pub async fn update(
        pool: &PgPool,
        username: &str,
        data: &UserUpdate,
    ) -> Result<User, DatabaseError> {
        let mut changes = sql::to_changes(data)?;
        if let Some(password) = &data.password {
            // Replacing an existing key keeps its position
            changes.insert("password".to_string(), Value::String(hash_password(password).await?));
        }

        let set = sql_for_partial_update(&changes, USER_COLUMNS)?;
        let query = format!(
            "UPDATE users SET {} WHERE username = ${} RETURNING {}",
            set.set_cols,
            set.next_param(),
            USER_FIELDS
        );
        let mut params = set.values;
        params.push(json!(username));

        sql::fetch_optional(pool, &SqlResult { query, params })
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("No user: {}", username)))
    }

    pub async fn remove(pool: &PgPool, username: &str) -> Result<(), DatabaseError> {
        let deleted = sql::execute(
            pool,
            &SqlResult {
                query: "DELETE FROM users WHERE username = $1".to_string(),
                params: vec![json!(username)],
            },
        )
        .await?;

        if deleted == 0 {
            return Err(DatabaseError::not_found(format!("No user: {}", username)));
        }
        Ok(())
    }

    /// Record an application from `username` to job `job_id`
    pub async fn apply_to_job(pool: &PgPool, username: &str, job_id: i32) -> Result<(), DatabaseError> {
        let job = sqlx::query_scalar::<_, i32>("SELECT id FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await?;
        if job.is_none() {
            return Err(DatabaseError::not_found(format!("No job: {}", job_id)));
        }

        let user = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        if user.is_none() {
            return Err(DatabaseError::not_found(format!("No username: {}", username)));
        }

        sqlx::query("INSERT INTO applications (job_id, username) VALUES ($1, $2)")
            .bind(job_id)
            .bind(username)
            .execute(pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::bad_request(format!(
                        "{} already applied to job {}",
                        username, job_id
                    ))
                } else {
                    e.into()
                }
            })?;

        Ok(())
    }
}
