use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::create_token;
use crate::database::models::{Credentials, NewUser, Registration, User};
use crate::middleware::{ApiResponse, ApiResult, ValidJson};

/// POST /auth/token - exchange username/password for a JWT
pub async fn token(
    State(state): State<AppState>,
    ValidJson(credentials): ValidJson<Credentials>,
) -> ApiResult<Value> {
    let user = User::authenticate(&state.pool, &credentials.username, &credentials.password).await?;
    let token = create_token(&user)?;
    Ok(ApiResponse::success(json!({ "token": token })))
}

/// POST /auth/register - create a non-admin account and return its JWT
pub async fn register(
    State(state): State<AppState>,
    ValidJson(registration): ValidJson<Registration>,
) -> ApiResult<Value> {
    let user = User::register(&state.pool, &NewUser::from(registration)).await?;
    tracing::info!("Registered user '{}'", user.username);
    let token = create_token(&user)?;
    Ok(ApiResponse::created(json!({ "token": token })))
}
