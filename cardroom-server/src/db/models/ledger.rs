//! Daily Order Ledger Models

use serde::{Deserialize, Serialize};

use super::BillItem;

/// Day-level order aggregate, one record per venue-timezone calendar day
///
/// `order_count` / `order_total` are maintained by in-transaction increments
/// alongside each entry insert, never recomputed by scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLedger {
    /// Ledger date (YYYY-MM-DD), also the record key
    pub date: String,

    #[serde(default)]
    pub order_count: i64,

    #[serde(default)]
    pub order_total: i64,

    pub created_at: i64,
    pub updated_at: i64,
}

/// One placed order batch, snapshotted under its day's ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Record id as `ledger_entry:key` string
    #[serde(default)]
    pub id: Option<String>,

    /// Ledger date (YYYY-MM-DD) this entry is counted under
    pub ledger_date: String,

    /// Ordering patron id as `patron:key` string
    pub patron: String,

    pub patron_name: String,

    pub items: Vec<BillItem>,

    /// Batch total in smallest currency unit
    pub total: i64,

    #[serde(default)]
    pub current_table: Option<String>,

    #[serde(default)]
    pub current_seat: Option<String>,

    /// Kitchen flow status, always `preparing` on insert
    pub status: String,

    pub created_at: i64,
}
