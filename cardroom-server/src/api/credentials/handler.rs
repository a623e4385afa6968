//! QR Credential Handlers

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::credential::{CredentialKind, QrCredential};
use crate::utils::{AppResponse, AppResult, ok};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    /// JSON string for the client to render as a QR image
    pub payload: String,
    pub credential: QrCredential,
    pub expires_at: i64,
}

/// Issue a fresh credential for the caller
///
/// The kind follows the caller's role, so a patron account can never
/// obtain a staff credential.
pub async fn issue(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<AppResponse<IssueResponse>>> {
    let kind = if user.is_staff() {
        CredentialKind::Staff
    } else {
        CredentialKind::Patron
    };

    let credential = state.codec.issue(&user.id, &user.login_id, kind)?;
    let payload = state.codec.encode(&credential)?;
    let expires_at = credential.expires_at();

    tracing::info!(uid = %user.id, ?kind, "Credential issued");

    Ok(ok(IssueResponse {
        payload,
        credential,
        expires_at,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub payload: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    /// Present only when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<QrCredential>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Verify a scanned payload without acting on it
///
/// Valid means both: the signature and TTL check out, and the subject is a
/// known account. A well-signed credential for a deleted account is as
/// invalid as a forged one.
pub async fn verify(
    State(state): State<ServerState>,
    Json(req): Json<VerifyRequest>,
) -> AppResult<Json<AppResponse<VerifyResponse>>> {
    let Some(credential) = state.codec.verify_decode(&req.payload) else {
        return Ok(ok(VerifyResponse {
            valid: false,
            credential: None,
            display_name: None,
        }));
    };

    let patron = state.patrons.find_by_uid(&credential.uid).await?;
    let Some(patron) = patron else {
        return Ok(ok(VerifyResponse {
            valid: false,
            credential: None,
            display_name: None,
        }));
    };

    Ok(ok(VerifyResponse {
        valid: true,
        credential: Some(credential),
        display_name: Some(patron.display_name),
    }))
}
