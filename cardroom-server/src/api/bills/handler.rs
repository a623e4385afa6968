//! Bill Handlers

use axum::{Json, extract::State};

use crate::billing::OpenStay;
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

/// Currently open stays, sorted by display name
pub async fn open_bills(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<OpenStay>>>> {
    let stays = state.billing.list_open_stays().await?;
    Ok(ok(stays))
}
