mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use jobly_api::auth::validate_jwt;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let (status, payload) = server.get("/health", None).await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", payload);
    assert_eq!(payload["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn token_issued_for_valid_credentials() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let (status, payload) = server
        .post("/auth/token", None, json!({ "username": "u1", "password": "password-u1" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", payload);

    let token = payload["data"]["token"].as_str().unwrap_or_default();
    let claims = validate_jwt(token)?;
    assert_eq!(claims.username, "u1");
    assert!(!claims.is_admin);
    Ok(())
}

#[tokio::test]
async fn token_rejects_bad_credentials() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let (status, _) = server
        .post("/auth/token", None, json!({ "username": "u1", "password": "wrong-pw" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, payload) = server
        .post("/auth/token", None, json!({ "username": "nope", "password": "password" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(payload["message"], "Invalid username/password");
    Ok(())
}

#[tokio::test]
async fn token_rejects_malformed_body() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let (status, _) = server.post("/auth/token", None, json!({ "username": "u1" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/auth/token", None, json!({ "username": 42, "password": "password" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_creates_non_admin() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let (status, payload) = server
        .post(
            "/auth/register",
            None,
            json!({
                "username": "new",
                "password": "password",
                "firstName": "first",
                "lastName": "last",
                "email": "new@email.com"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", payload);

    let token = payload["data"]["token"].as_str().unwrap_or_default();
    let claims = validate_jwt(token)?;
    assert_eq!(claims.username, "new");
    assert!(!claims.is_admin);
    Ok(())
}

#[tokio::test]
async fn register_rejects_admin_flag_and_duplicates() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let body = json!({
        "username": "u1",
        "password": "password",
        "firstName": "first",
        "lastName": "last",
        "email": "u1@email.com"
    });
    let (status, payload) = server.post("/auth/register", None, body.clone()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["message"], "Duplicate username: u1");

    let mut sneaky = body;
    sneaky["username"] = json!("sneaky");
    sneaky["isAdmin"] = json!(true);
    let (status, _) = server.post("/auth/register", None, sneaky).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_validates_fields() -> Result<()> {
    let Some(server) = common::setup().await? else { return Ok(()) };

    let (status, payload) = server
        .post(
            "/auth/register",
            None,
            json!({
                "username": "new",
                "password": "password",
                "firstName": "first",
                "lastName": "last",
                "email": "not-an-email"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(payload["field_errors"]["email"].is_string(), "unexpected body: {}", payload);
    Ok(())
}
