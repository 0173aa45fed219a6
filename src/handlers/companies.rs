use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Company, CompanyDetail, CompanyFilter, CompanyUpdate, NewCompany};
use crate::middleware::{ApiResponse, ApiResult, ValidJson, ValidPath, ValidQuery};

/// POST /companies (admin)
pub async fn create(
    State(state): State<AppState>,
    ValidJson(data): ValidJson<NewCompany>,
) -> ApiResult<Company> {
    let company = Company::create(&state.pool, &data).await?;
    Ok(ApiResponse::created(company))
}

/// GET /companies?name=&minEmployees=&maxEmployees=
pub async fn list(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<CompanyFilter>,
) -> ApiResult<Vec<Company>> {
    let companies = Company::find_all(&state.pool, &filter).await?;
    Ok(ApiResponse::success(companies))
}

/// GET /companies/:handle
pub async fn get(
    State(state): State<AppState>,
    ValidPath(handle): ValidPath<String>,
) -> ApiResult<CompanyDetail> {
    let company = Company::get(&state.pool, &handle).await?;
    Ok(ApiResponse::success(company))
}

/// PATCH /companies/:handle (admin)
pub async fn update(
    State(state): State<AppState>,
    ValidPath(handle): ValidPath<String>,
    ValidJson(data): ValidJson<CompanyUpdate>,
) -> ApiResult<Company> {
    let company = Company::update(&state.pool, &handle, &data).await?;
    Ok(ApiResponse::success(company))
}

/// DELETE /companies/:handle (admin)
pub async fn delete(
    State(state): State<AppState>,
    ValidPath(handle): ValidPath<String>,
) -> ApiResult<Value> {
    Company::remove(&state.pool, &handle).await?;
    Ok(ApiResponse::success(json!({ "deleted": handle })))
}
