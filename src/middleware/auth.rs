use std::collections::HashMap;

use axum::{
    extract::{Path, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub username: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            is_admin: claims.is_admin,
        }
    }
}

/// Attach the caller to the request when a valid bearer token is present.
///
/// A missing or invalid token is not an error here; the guards below decide
/// whether the route needs a caller at all.
pub async fn authenticate_jwt(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_jwt_from_headers(&headers) {
        match validate_jwt(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(e) => tracing::debug!("Ignoring bearer token: {}", e),
        }
    }

    next.run(request).await
}

/// Authenticated admins only
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin => Ok(next.run(request).await),
        _ => Err(ApiError::unauthorized("Admin access required")),
    }
}

/// The user named by the `:username` path segment, or an admin
pub async fn require_correct_user_or_admin(
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let allowed = match (request.extensions().get::<AuthUser>(), params.get("username")) {
        (Some(user), _) if user.is_admin => true,
        (Some(user), Some(username)) => user.username == *username,
        _ => false,
    };

    if !allowed {
        return Err(ApiError::unauthorized("Must be this user or an admin"));
    }
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_jwt;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware::from_fn,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn whoami(user: Option<Extension<AuthUser>>) -> String {
        user.map(|Extension(u)| u.username).unwrap_or_default()
    }

    fn bearer(username: &str, is_admin: bool) -> String {
        let token = generate_jwt(&Claims::new(username.to_string(), is_admin)).unwrap();
        format!("Bearer {}", token)
    }

    fn router() -> Router {
        Router::new()
            .route("/open", get(whoami))
            .route("/admin", get(whoami).route_layer(from_fn(require_admin)))
            .route(
                "/users/:username",
                get(whoami).route_layer(from_fn(require_correct_user_or_admin)),
            )
            .layer(from_fn(authenticate_jwt))
    }

    async fn status(uri: &str, auth: Option<String>) -> StatusCode {
        let mut req = HttpRequest::builder().uri(uri);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        router()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn parses_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer  ".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers), None);
    }

    #[tokio::test]
    async fn open_routes_work_with_bad_tokens() {
        assert_eq!(status("/open", None).await, StatusCode::OK);
        assert_eq!(status("/open", Some("Bearer garbage".into())).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_guard() {
        assert_eq!(status("/admin", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status("/admin", Some("Bearer garbage".into())).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status("/admin", Some(bearer("u1", false))).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status("/admin", Some(bearer("admin", true))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn correct_user_or_admin_guard() {
        assert_eq!(status("/users/u1", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status("/users/u1", Some(bearer("u2", false))).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status("/users/u1", Some(bearer("u1", false))).await, StatusCode::OK);
        assert_eq!(status("/users/u1", Some(bearer("admin", true))).await, StatusCode::OK);
    }
}
