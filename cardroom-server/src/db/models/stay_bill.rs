//! Stay Bill Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Open,
    Closed,
}

/// One ordered line on a stay bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillItem {
    pub menu_item_id: String,
    pub category: String,
    pub name: String,
    /// Smallest currency unit
    pub unit_price: i64,
    pub quantity: i64,
    /// `unit_price * quantity`, computed server-side
    pub line_total: i64,
    pub ordered_at: i64,
}

/// Ad-hoc charge outside the item list (e.g. entrance fee)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraCharge {
    pub name: String,
    pub price: i64,
    pub created_at: i64,
}

/// The accruing charge record for one stay
///
/// `total_price` is always the sum of item line totals and extra charges.
/// It is never written independently; every mutation adds the same delta to
/// both the lines and the total inside one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayBill {
    /// Record id as `stay_bill:key` string
    #[serde(default)]
    pub id: Option<String>,

    /// Owning patron id as `patron:key` string
    pub owner: String,

    /// Display name snapshot at check-in
    pub patron_name: String,

    pub status: BillStatus,

    #[serde(default)]
    pub items: Vec<BillItem>,

    #[serde(default)]
    pub extra_cost: Vec<ExtraCharge>,

    #[serde(default)]
    pub total_price: i64,

    #[serde(default)]
    pub current_table: Option<String>,

    #[serde(default)]
    pub current_seat: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,

    #[serde(default)]
    pub settled_at: Option<i64>,
}
