//! Authentication middleware
//!
//! Axum middleware for JWT authentication and staff-role authorization.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;

/// Authentication middleware - requires a logged-in caller
///
/// Extracts and validates the JWT from `Authorization: Bearer <token>` and
/// injects [`CurrentUser`] into request extensions.
///
/// Skipped for:
/// - `OPTIONS *` (CORS preflight)
/// - non-`/api/` paths
/// - `/api/auth/login` and `/api/health`
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    let is_public_api_route = path == "/api/auth/login" || path == "/api/health";
    if is_public_api_route {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = JwtService::extract_from_header(auth_header).ok_or(AppError::Unauthorized)?;

    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|e| match e {
            crate::auth::jwt::JwtError::ExpiredToken => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })?;

    req.extensions_mut().insert(CurrentUser::from(claims));

    Ok(next.run(req).await)
}

/// Authorization middleware - requires the `staff` role
///
/// Applied per-router on top of [`require_auth`], which has already
/// injected [`CurrentUser`].
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.is_staff() {
        return Err(AppError::Forbidden("Staff role required".to_string()));
    }

    Ok(next.run(req).await)
}
