//! Visit Routes - check-in / check-out, staff terminal only

mod handler;

use axum::{Router, middleware::from_fn, routing::get, routing::post};

use crate::auth::require_staff;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/visits/check-in", post(handler::check_in))
        .route("/api/visits/check-out", post(handler::check_out))
        .route("/api/visits/manual-check-in", post(handler::manual_check_in))
        .route("/api/visits/status/{uid}", get(handler::status))
        .route_layer(from_fn(require_staff))
}
