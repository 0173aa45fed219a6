use axum::{
    extract::State,
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::create_token;
use crate::database::models::{NewUser, User, UserDetail, UserUpdate};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, ValidJson, ValidPath};

/// POST /users (admin) - unlike registration, may create admins
pub async fn create(
    State(state): State<AppState>,
    ValidJson(data): ValidJson<NewUser>,
) -> ApiResult<Value> {
    let user = User::register(&state.pool, &data).await?;
    let token = create_token(&user)?;
    Ok(ApiResponse::created(json!({ "user": user, "token": token })))
}

/// GET /users (admin)
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = User::find_all(&state.pool).await?;
    Ok(ApiResponse::success(users))
}

/// GET /users/:username (self or admin)
pub async fn get(
    State(state): State<AppState>,
    ValidPath(username): ValidPath<String>,
) -> ApiResult<UserDetail> {
    let user = User::get(&state.pool, &username).await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /users/:username (self or admin)
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ValidPath(username): ValidPath<String>,
    ValidJson(data): ValidJson<UserUpdate>,
) -> ApiResult<User> {
    if data.is_admin.is_some() && !caller.is_admin {
        return Err(ApiError::unauthorized("Only admins may change admin status"));
    }

    let user = User::update(&state.pool, &username, &data).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /users/:username (self or admin)
pub async fn delete(
    State(state): State<AppState>,
    ValidPath(username): ValidPath<String>,
) -> ApiResult<Value> {
    User::remove(&state.pool, &username).await?;
    Ok(ApiResponse::success(json!({ "deleted": username })))
}

/// POST /users/:username/jobs/:id (self or admin)
pub async fn apply(
    State(state): State<AppState>,
    ValidPath((username, job_id)): ValidPath<(String, i32)>,
) -> ApiResult<Value> {
    User::apply_to_job(&state.pool, &username, job_id).await?;
    Ok(ApiResponse::success(json!({ "applied": job_id })))
}
