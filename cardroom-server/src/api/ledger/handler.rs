//! Ledger Handlers

use axum::{Json, extract::Path, extract::State};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::models::LedgerEntry;
use crate::ledger::DailySummary;
use crate::utils::{AppResponse, AppResult, ok};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub summary: DailySummary,
    /// Newest first
    pub entries: Vec<LedgerEntry>,
}

/// Day aggregate plus every entry of that day
///
/// A day with no orders is a normal report full of zeros, not a 404.
pub async fn day_report(
    State(state): State<ServerState>,
    Path(date): Path<String>,
) -> AppResult<Json<AppResponse<DayReport>>> {
    let summary = state.ledger.daily_summary(&date).await?;
    let entries = state.ledger.entries(&date).await?;

    Ok(ok(DayReport { summary, entries }))
}
