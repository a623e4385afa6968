//! Visit Handlers
//!
//! Business-rule outcomes (`alreadyCheckedIn`, `invalidCredential`, ...)
//! come back as 200 responses with an `outcome` tag; the terminal decides
//! what to show the desk operator. HTTP errors are reserved for bad
//! requests and system faults.

use axum::{Extension, Json, extract::Path, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::billing::{SettlementSummary, StayOpened};
use crate::core::ServerState;
use crate::db::models::PatronStatus;
use crate::session::{CheckInOutcome, CheckOutOutcome, ManualCheckInOutcome};
use crate::utils::{AppError, AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub payload: String,
    /// Smallest currency unit; the configured default when omitted
    pub entrance_fee: Option<i64>,
    pub fee_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stay: Option<StayOpened>,
}

pub async fn check_in(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CheckInRequest>,
) -> AppResult<Json<AppResponse<CheckInResponse>>> {
    let fee = req.entrance_fee.unwrap_or(state.config.default_entrance_fee);

    let outcome = state
        .session
        .check_in(&req.payload, fee, req.fee_description, Some(user.login_id))
        .await?;

    let (outcome, stay) = match outcome {
        CheckInOutcome::CheckedIn(stay) => ("checkedIn", Some(stay)),
        CheckInOutcome::AlreadyCheckedIn => ("alreadyCheckedIn", None),
        CheckInOutcome::InvalidCredential => ("invalidCredential", None),
        CheckInOutcome::WrongKind => ("wrongKind", None),
        CheckInOutcome::UnknownSubject => ("unknownSubject", None),
    };

    Ok(ok(CheckInResponse { outcome, stay }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub payload: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementSummary>,
}

pub async fn check_out(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CheckOutRequest>,
) -> AppResult<Json<AppResponse<CheckOutResponse>>> {
    let outcome = state
        .session
        .check_out(&req.payload, Some(user.login_id))
        .await?;

    let (outcome, settlement) = match outcome {
        CheckOutOutcome::CheckedOut(summary) => ("checkedOut", Some(summary)),
        CheckOutOutcome::NotStaying => ("notStaying", None),
        CheckOutOutcome::InvalidCredential => ("invalidCredential", None),
        CheckOutOutcome::WrongKind => ("wrongKind", None),
        CheckOutOutcome::UnknownSubject => ("unknownSubject", None),
    };

    Ok(ok(CheckOutResponse { outcome, settlement }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualCheckInRequest {
    #[validate(length(min = 1, message = "loginId must not be empty"))]
    pub login_id: String,

    #[validate(length(min = 4, max = 8, message = "PIN must be 4 to 8 digits"))]
    pub pin: String,

    pub entrance_fee: Option<i64>,
    pub fee_description: Option<String>,
}

pub async fn manual_check_in(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ManualCheckInRequest>,
) -> AppResult<Json<AppResponse<CheckInResponse>>> {
    req.validate()?;

    let fee = req.entrance_fee.unwrap_or(state.config.default_entrance_fee);

    let outcome = state
        .session
        .manual_check_in(
            &req.login_id,
            &req.pin,
            fee,
            req.fee_description,
            Some(user.login_id),
        )
        .await?;

    let (outcome, stay) = match outcome {
        ManualCheckInOutcome::CheckedIn(stay) => ("checkedIn", Some(stay)),
        ManualCheckInOutcome::AlreadyCheckedIn => ("alreadyCheckedIn", None),
        ManualCheckInOutcome::InvalidLogin => ("invalidLogin", None),
    };

    Ok(ok(CheckInResponse { outcome, stay }))
}

pub async fn status(
    State(state): State<ServerState>,
    Path(uid): Path<String>,
) -> AppResult<Json<AppResponse<PatronStatus>>> {
    let status = state
        .session
        .status(&uid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Patron {uid} not found")))?;

    Ok(ok(status))
}
