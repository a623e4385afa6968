//! API route modules
//!
//! # Routes
//!
//! | Path | Method | Auth | Purpose |
//! |------|--------|------|---------|
//! | /api/health | GET | none | Health check |
//! | /api/auth/login | POST | none | Login id + PIN, returns JWT |
//! | /api/auth/me | GET | user | Current caller info |
//! | /api/credentials | POST | user | Issue own QR credential |
//! | /api/credentials/verify | POST | staff | Verify a scanned payload |
//! | /api/visits/check-in | POST | staff | Check in from scanned payload |
//! | /api/visits/check-out | POST | staff | Check out from scanned payload |
//! | /api/visits/manual-check-in | POST | staff | Desk check-in by login + PIN |
//! | /api/visits/status/{uid} | GET | staff | Presence status lookup |
//! | /api/orders | POST | user | Place an order batch |
//! | /api/orders/history | GET | user | Own (or staff: any) order history |
//! | /api/bills/open | GET | staff | Currently open stays |
//! | /api/ledger/{date} | GET | staff | Day summary plus entries |

pub mod auth;
pub mod bills;
pub mod credentials;
pub mod health;
pub mod ledger;
pub mod orders;
pub mod visits;

use std::time::Duration;

use axum::Router;
use axum::middleware::from_fn_with_state;
use http::StatusCode;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::core::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// Assemble the full application router
pub fn create_router(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);
    let max_connections = state.config.max_connections;

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(credentials::router())
        .merge(visits::router())
        .merge(orders::router())
        .merge(bills::router())
        .merge(ledger::router())
        .layer(from_fn_with_state(state.clone(), require_auth))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(GlobalConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}
