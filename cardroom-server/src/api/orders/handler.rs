//! Order Handlers

use axum::{Extension, Json, extract::Query, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::billing::{OrderItemInput, OrderPlaced, PlaceOrderOutcome};
use crate::core::ServerState;
use crate::ledger::PatronHistory;
use crate::utils::{AppError, AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemInput>,
    /// Staff only: place on another patron's bill
    pub subject_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderPlaced>,
}

/// Place an order batch on an open bill
pub async fn place(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PlaceOrderRequest>,
) -> AppResult<Json<AppResponse<PlaceOrderResponse>>> {
    let uid = match req.subject_id {
        Some(subject) if subject != user.id => {
            if !user.is_staff() {
                return Err(AppError::Forbidden(
                    "Only staff may order for another patron".to_string(),
                ));
            }
            subject
        }
        _ => user.id,
    };

    let outcome = state.billing.place_order(&uid, &req.items).await?;

    let (outcome, order) = match outcome {
        PlaceOrderOutcome::Placed(placed) => ("ok", Some(placed)),
        PlaceOrderOutcome::NotCheckedIn => ("notCheckedIn", None),
    };

    Ok(ok(PlaceOrderResponse { outcome, order }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// Staff only when different from the caller
    pub uid: Option<String>,
    /// Inclusive ledger date bounds, YYYY-MM-DD
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

/// Order history with range totals, newest first
pub async fn history(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<AppResponse<PatronHistory>>> {
    let uid = params.uid.unwrap_or_else(|| user.id.clone());
    if uid != user.id && !user.is_staff() {
        return Err(AppError::Forbidden(
            "Only staff may read another patron's history".to_string(),
        ));
    }

    let history = state
        .ledger
        .patron_history(
            &uid,
            params.from.as_deref(),
            params.to.as_deref(),
            params.limit,
        )
        .await?;

    Ok(ok(history))
}
