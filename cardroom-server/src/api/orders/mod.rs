//! Order Routes

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

/// Any authenticated caller; staff may act for another patron
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", post(handler::place))
        .route("/api/orders/history", get(handler::history))
}
