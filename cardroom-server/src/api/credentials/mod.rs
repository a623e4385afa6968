//! QR Credential Routes

mod handler;

use axum::{Router, middleware::from_fn, routing::post};

use crate::auth::require_staff;
use crate::core::ServerState;

/// - `/api/credentials`: any authenticated caller, issues for themselves
/// - `/api/credentials/verify`: staff scanning terminal only
pub fn router() -> Router<ServerState> {
    let staff = Router::new()
        .route("/api/credentials/verify", post(handler::verify))
        .route_layer(from_fn(require_staff));

    Router::new()
        .route("/api/credentials", post(handler::issue))
        .merge(staff)
}
