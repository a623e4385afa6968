//! Utility module - shared helpers and types
//!
//! - [`AppError`] / [`AppResult`] - application error type and result alias
//! - [`AppResponse`] - API response envelope
//! - time helpers for venue-timezone business dates

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResponse, AppResult, ok};
pub use time::{current_venue_date, now_millis, parse_date};
