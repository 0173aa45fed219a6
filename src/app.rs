use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::database::DatabaseManager;
use crate::handlers;
use crate::middleware::{authenticate_jwt, require_admin, require_correct_user_or_admin};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

pub fn app(pool: PgPool) -> Router {
    let state = AppState { pool };

    Router::new()
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(company_routes())
        .merge(job_routes())
        .merge(user_routes())
        .with_state(state)
        // Global middleware
        .layer(from_fn(authenticate_jwt))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/token", post(auth::token))
        .route("/auth/register", post(auth::register))
}

fn company_routes() -> Router<AppState> {
    use handlers::companies;

    Router::new()
        .route(
            "/companies",
            get(companies::list).merge(post(companies::create).route_layer(from_fn(require_admin))),
        )
        .route(
            "/companies/:handle",
            get(companies::get).merge(
                axum::routing::patch(companies::update)
                    .delete(companies::delete)
                    .route_layer(from_fn(require_admin)),
            ),
        )
}

fn job_routes() -> Router<AppState> {
    use handlers::jobs;

    Router::new()
        .route(
            "/jobs",
            get(jobs::list).merge(post(jobs::create).route_layer(from_fn(require_admin))),
        )
        .route(
            "/jobs/:id",
            get(jobs::get).merge(
                axum::routing::patch(jobs::update)
                    .delete(jobs::delete)
                    .route_layer(from_fn(require_admin)),
            ),
        )
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route(
            "/users",
            post(users::create)
                .get(users::list)
                .route_layer(from_fn(require_admin)),
        )
        .route(
            "/users/:username",
            get(users::get)
                .patch(users::update)
                .delete(users::delete)
                .route_layer(from_fn(require_correct_user_or_admin)),
        )
        .route(
            "/users/:username/jobs/:id",
            post(users::apply).route_layer(from_fn(require_correct_user_or_admin)),
        )
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
