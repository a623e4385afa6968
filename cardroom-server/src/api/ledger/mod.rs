//! Ledger Routes - staff reporting

mod handler;

use axum::{Router, middleware::from_fn, routing::get};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/ledger/{date}", get(handler::day_report))
        .route_layer(from_fn(require_staff))
}
