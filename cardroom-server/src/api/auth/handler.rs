//! Authentication Handlers

use std::time::Duration;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{CurrentUser, verify_pin};
use crate::core::ServerState;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// Fixed delay on the login path so response timing does not reveal
/// whether the login id exists
const AUTH_FIXED_DELAY_MS: u64 = 500;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "loginId must not be empty"))]
    pub login_id: String,

    #[validate(length(min = 4, max = 8, message = "PIN must be 4 to 8 digits"))]
    pub pin: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub uid: String,
    pub login_id: String,
    pub display_name: String,
    /// `patron` or `staff`
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_minutes: i64,
    pub user: UserInfo,
}

/// Login with login id + PIN, returns a JWT session token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AppResponse<LoginResponse>>> {
    req.validate()?;

    let patron = state.patrons.find_by_login_id(&req.login_id).await?;

    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let Some(patron) = patron else {
        tracing::warn!(login_id = %req.login_id, "Login failed: unknown login id");
        return Err(AppError::invalid_credentials());
    };

    if !verify_pin(&req.pin, &patron.pin_hash) {
        tracing::warn!(login_id = %req.login_id, "Login failed: wrong PIN");
        return Err(AppError::invalid_credentials());
    }

    let id = patron
        .id
        .as_deref()
        .ok_or_else(|| AppError::internal("Patron record has no id"))?;
    let uid = id.strip_prefix("patron:").unwrap_or(id);

    let token = state
        .jwt_service
        .generate_token(uid, &patron.login_id, &patron.display_name, patron.role)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    tracing::info!(uid, login_id = %patron.login_id, "Login succeeded");

    Ok(ok(LoginResponse {
        token,
        expires_in_minutes: state.jwt_service.config.expiration_minutes,
        user: UserInfo {
            uid: uid.to_string(),
            login_id: patron.login_id,
            display_name: patron.display_name,
            role: match patron.role {
                crate::db::models::PatronRole::Patron => "patron".to_string(),
                crate::db::models::PatronRole::Staff => "staff".to_string(),
            },
        },
    }))
}

/// Current caller, from the validated token
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<AppResponse<UserInfo>> {
    ok(UserInfo {
        uid: user.id,
        login_id: user.login_id,
        display_name: user.display_name,
        role: user.role,
    })
}
