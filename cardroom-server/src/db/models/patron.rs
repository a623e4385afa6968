//! Patron Model

use serde::{Deserialize, Serialize};

/// Role tag on a patron account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatronRole {
    Patron,
    Staff,
}

/// Patron entity
///
/// `is_staying` is the single source of truth for whether an open stay bill
/// exists for this patron. Only the billing engine flips it, and always in
/// the same transaction as the bill mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patron {
    /// Record id as `patron:key` string
    #[serde(default)]
    pub id: Option<String>,

    /// Login handle (unique)
    pub login_id: String,

    /// Display name shown to operators
    pub display_name: String,

    /// Argon2 hash of the 4-digit PIN
    pub pin_hash: String,

    pub role: PatronRole,

    #[serde(default)]
    pub is_staying: bool,

    #[serde(default)]
    pub current_table: Option<String>,

    #[serde(default)]
    pub current_seat: Option<String>,

    #[serde(default)]
    pub last_check_in_at: Option<i64>,

    #[serde(default)]
    pub last_check_out_at: Option<i64>,

    pub created_at: i64,
}

/// Read-only presence status projection
///
/// Built in Rust from [`Patron`], never read from the store, so it can use
/// API casing directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatronStatus {
    pub uid: String,
    pub login_id: String,
    pub display_name: String,
    pub is_staying: bool,
    #[serde(default)]
    pub last_check_in_at: Option<i64>,
    #[serde(default)]
    pub last_check_out_at: Option<i64>,
}
