#![allow(dead_code)]

use std::sync::Once;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use sqlx::{Executor, PgPool};
use tokio::sync::{Mutex, MutexGuard};

use jobly_api::auth::{generate_jwt, Claims};
use jobly_api::database::models::{Company, NewCompany, NewUser, User};
use jobly_api::database::DatabaseManager;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

// Every test rewrites the same tables, so they take turns
static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static TEST_ENV: Once = Once::new();

pub struct TestServer {
    pub base_url: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
    pub u1_token: String,
    pub u2_token: String,
    pub admin_token: String,
    /// Ids of J1..J4 in insertion order
    pub job_ids: Vec<i32>,
    _guard: MutexGuard<'static, ()>,
}

/// Start a server over freshly seeded tables.
///
/// Returns `None` when `TEST_DATABASE_URL` is unset so the suite can run
/// without a database.
pub async fn setup() -> Result<Option<TestServer>> {
    TEST_ENV.call_once(|| {
        std::env::set_var("APP_ENV", "test");
    });

    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping database test");
        return Ok(None);
    };

    let guard = DB_LOCK.lock().await;

    let pool = DatabaseManager::connect_to(&url).await.context("failed to connect to test database")?;
    pool.execute(SCHEMA).await.context("failed to apply schema")?;
    pool.execute("TRUNCATE applications, jobs, companies, users RESTART IDENTITY CASCADE")
        .await?;

    let job_ids = seed(&pool).await?;

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let app = jobly_api::app(pool.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(Some(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
        u1_token: token_for("u1", false),
        u2_token: token_for("u2", false),
        admin_token: token_for("admin", true),
        job_ids,
        _guard: guard,
    }))
}

pub fn token_for(username: &str, is_admin: bool) -> String {
    generate_jwt(&Claims::new(username.to_string(), is_admin)).expect("token")
}

async fn seed(pool: &PgPool) -> Result<Vec<i32>> {
    for n in 1..=3 {
        Company::create(
            pool,
            &NewCompany {
                handle: format!("c{n}"),
                name: format!("C{n}"),
                description: format!("Desc{n}"),
                num_employees: Some(n),
                logo_url: Some(format!("http://c{n}.img")),
            },
        )
        .await?;
    }

    let mut job_ids = vec![];
    for (title, salary, equity, handle) in [
        ("J1", 1, Some("0.1"), "c1"),
        ("J2", 2, Some("0.2"), "c1"),
        ("J3", 3, None, "c1"),
        ("J4", 4, Some("0"), "c2"),
    ] {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO jobs (title, salary, equity, company_handle) \
             VALUES ($1, $2, $3::numeric, $4) RETURNING id",
        )
        .bind(title)
        .bind(salary)
        .bind(equity)
        .bind(handle)
        .fetch_one(pool)
        .await?;
        job_ids.push(id);
    }

    for (username, is_admin) in [("u1", false), ("u2", false), ("admin", true)] {
        User::register(
            pool,
            &NewUser {
                username: username.to_string(),
                password: format!("password-{username}"),
                first_name: format!("{username}F"),
                last_name: format!("{username}L"),
                email: format!("{username}@user.com"),
                is_admin,
            },
        )
        .await?;
    }

    User::apply_to_job(pool, "u1", job_ids[0]).await?;

    Ok(job_ids)
}

impl TestServer {
    /// Send a request and return status plus parsed JSON body
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let payload = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, payload))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, token, None).await
    }

    pub fn u1(&self) -> Option<&str> {
        Some(&self.u1_token)
    }

    pub fn u2(&self) -> Option<&str> {
        Some(&self.u2_token)
    }

    pub fn admin(&self) -> Option<&str> {
        Some(&self.admin_token)
    }
}

/// Field `key` of every record in a `data` array
pub fn pluck(payload: &Value, key: &str) -> Vec<Value> {
    payload["data"]
        .as_array()
        .map(|rows| rows.iter().map(|r| r[key].clone()).collect())
        .unwrap_or_default()
}
