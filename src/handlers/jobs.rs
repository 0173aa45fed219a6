use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Job, JobDetail, JobFilter, JobListing, JobUpdate, NewJob};
use crate::middleware::{ApiResponse, ApiResult, ValidJson, ValidPath, ValidQuery};

/// POST /jobs (admin)
pub async fn create(
    State(state): State<AppState>,
    ValidJson(data): ValidJson<NewJob>,
) -> ApiResult<Job> {
    let job = Job::create(&state.pool, &data).await?;
    Ok(ApiResponse::created(job))
}

/// GET /jobs?title=&minSalary=&hasEquity=
pub async fn list(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<JobFilter>,
) -> ApiResult<Vec<JobListing>> {
    let jobs = Job::find_all(&state.pool, &filter).await?;
    Ok(ApiResponse::success(jobs))
}

/// GET /jobs/:id
pub async fn get(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> ApiResult<JobDetail> {
    let job = Job::get(&state.pool, id).await?;
    Ok(ApiResponse::success(job))
}

/// PATCH /jobs/:id (admin)
pub async fn update(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
    ValidJson(data): ValidJson<JobUpdate>,
) -> ApiResult<Job> {
    let job = Job::update(&state.pool, id, &data).await?;
    Ok(ApiResponse::success(job))
}

/// DELETE /jobs/:id (admin)
pub async fn delete(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i32>,
) -> ApiResult<Value> {
    Job::remove(&state.pool, id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}
