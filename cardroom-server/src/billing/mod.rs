//! Billing Transaction Engine
//!
//! The only component that mutates stay bills, the daily ledger, and the
//! `is_staying` flag on patrons. Every mutating operation here is one
//! SurrealQL transaction (`BEGIN ... COMMIT`): the store validates the read
//! set at commit time and aborts conflicting writers, so each operation is
//! retried as a whole on conflict.
//!
//! State checks (`already_checked_in`, `not_staying`, `not_checked_in`) run
//! inside the transaction via `THROW`, which both aborts the transaction
//! and carries the outcome marker back in the error text. These are
//! expected operator situations, not failures, and surface as `Ok` outcome
//! variants.

#[cfg(test)]
mod tests;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use validator::Validate;

use crate::db::models::{BillItem, ExtraCharge};
use crate::utils::{AppError, AppResult, current_venue_date, now_millis};

const MAX_TXN_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY_MS: u64 = 20;

// Outcome markers thrown inside transactions. A THROW surfaces as a
// per-statement error containing the marker text, so markers are matched
// by substring over the full error map.
const THROWN_ALREADY_CHECKED_IN: &str = "already_checked_in";
const THROWN_NOT_STAYING: &str = "not_staying";
const THROWN_NOT_CHECKED_IN: &str = "not_checked_in";
const THROWN_UNKNOWN_SUBJECT: &str = "unknown_subject";
const THROWN_MISSING_OPEN_BILL: &str = "missing_open_bill";

/// Transaction-level error, internal to the engine
#[derive(Debug)]
enum TxnError {
    /// Commit-time conflict; the whole operation is retried
    Conflict(String),
    /// Any other store failure; not retried
    Store(String),
}

fn is_conflict(msg: &str) -> bool {
    // RocksDB/memory engines word this differently across versions; both
    // mention either retryability or the conflict itself.
    msg.contains("can be retried") || msg.contains("conflict")
}

/// Collapse the per-statement error map into one ordered message
///
/// When a transaction aborts, only the statement that failed carries the
/// interesting error (a thrown marker, or the commit conflict); every
/// other statement reports a generic "not executed". `Response::check`
/// returns just the lowest-indexed error, which is usually one of the
/// generic ones, so classification has to look at the whole map.
fn failure_text(errors: HashMap<usize, surrealdb::Error>) -> String {
    let mut errors: Vec<_> = errors.into_iter().collect();
    errors.sort_by_key(|(index, _)| *index);
    errors
        .into_iter()
        .map(|(_, error)| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Retry an optimistic transaction up to [`MAX_TXN_ATTEMPTS`] times with
/// short exponential backoff, then surface a transient-failure error
/// distinguishable from data errors.
async fn with_retry<T, F, Fut>(op: &'static str, mut f: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TxnError>>,
{
    let mut last = String::new();
    for attempt in 0..MAX_TXN_ATTEMPTS {
        if attempt > 0 {
            let delay = RETRY_BASE_DELAY_MS << (attempt - 1);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match f().await {
            Ok(value) => return Ok(value),
            Err(TxnError::Conflict(msg)) => {
                tracing::debug!(op, attempt, "Transaction conflict, retrying");
                last = msg;
            }
            Err(TxnError::Store(msg)) => return Err(AppError::database(msg)),
        }
    }
    Err(AppError::unavailable(format!(
        "{op} aborted after {MAX_TXN_ATTEMPTS} attempts: {last}"
    )))
}

/// One item of an order request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[validate(length(min = 1, message = "menuItemId must not be empty"))]
    pub menu_item_id: String,

    #[serde(default)]
    pub category: String,

    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    /// Smallest currency unit
    #[validate(range(min = 0, message = "unitPrice must not be negative"))]
    pub unit_price: i64,

    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i64,
}

/// Successful check-in result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayOpened {
    pub bill_id: String,
    pub patron_name: String,
    pub total_price: i64,
}

#[derive(Debug)]
pub enum OpenStayOutcome {
    Opened(StayOpened),
    AlreadyCheckedIn,
    UnknownSubject,
}

/// Check-out settlement summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub bill_id: String,
    pub patron_name: String,
    pub total_price: i64,
    pub item_count: i64,
    pub stay_minutes: i64,
    pub settled_at: i64,
}

#[derive(Debug)]
pub enum CloseStayOutcome {
    Closed(SettlementSummary),
    NotStaying,
    UnknownSubject,
}

/// Successful order placement result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub bill_id: String,
    pub entry_id: String,
    /// Bill total after this batch
    pub new_total: i64,
    /// This batch's amount
    pub batch_total: i64,
}

#[derive(Debug)]
pub enum PlaceOrderOutcome {
    Placed(OrderPlaced),
    NotCheckedIn,
}

/// One row of the open-stays operator view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenStay {
    pub bill_id: String,
    pub patron_id: String,
    pub display_name: String,
    #[serde(default)]
    pub current_table: Option<String>,
    #[serde(default)]
    pub current_seat: Option<String>,
    pub total_price: i64,
    pub created_at: i64,
}

/// The billing transaction engine
#[derive(Clone)]
pub struct BillingEngine {
    db: Surreal<Db>,
    tz: Tz,
}

impl BillingEngine {
    pub fn new(db: Surreal<Db>, tz: Tz) -> Self {
        Self { db, tz }
    }

    /// Open a stay: flip the patron to staying and create the open bill,
    /// seeded with the entrance fee, in one transaction. A visit-log row is
    /// appended in the same transaction.
    pub async fn open_stay(
        &self,
        uid: &str,
        entrance_fee: i64,
        fee_description: Option<String>,
        source: &str,
        scanned_by: Option<String>,
    ) -> AppResult<OpenStayOutcome> {
        if entrance_fee < 0 {
            return Err(AppError::validation("entranceFee must not be negative"));
        }

        with_retry("open_stay", || {
            self.open_stay_txn(
                uid,
                entrance_fee,
                fee_description.clone(),
                source,
                scanned_by.clone(),
            )
        })
        .await
    }

    async fn open_stay_txn(
        &self,
        uid: &str,
        entrance_fee: i64,
        fee_description: Option<String>,
        source: &str,
        scanned_by: Option<String>,
    ) -> Result<OpenStayOutcome, TxnError> {
        let now = now_millis();
        let extra_cost: Vec<ExtraCharge> = if entrance_fee > 0 {
            vec![ExtraCharge {
                name: fee_description.unwrap_or_else(|| "Entrance fee".to_string()),
                price: entrance_fee,
                created_at: now,
            }]
        } else {
            vec![]
        };

        let result = self
            .db
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $patron = (SELECT * FROM type::thing('patron', $uid))[0];
                IF $patron == NONE { THROW 'unknown_subject' };
                IF $patron.is_staying { THROW 'already_checked_in' };
                UPDATE type::thing('patron', $uid) SET
                    is_staying = true,
                    last_check_in_at = $now;
                LET $bill = CREATE stay_bill SET
                    owner = type::thing('patron', $uid),
                    patron_name = $patron.display_name,
                    status = 'open',
                    items = [],
                    extra_cost = $extra_cost,
                    total_price = $fee,
                    current_table = $patron.current_table,
                    current_seat = $patron.current_seat,
                    created_at = $now,
                    updated_at = $now,
                    settled_at = NONE;
                CREATE visit_log SET
                    patron = type::thing('patron', $uid),
                    action = 'checkin',
                    at = $now,
                    source = $source,
                    scanned_by = $scanned_by;
                RETURN {
                    billId: <string> $bill[0].id,
                    patronName: $patron.display_name,
                    totalPrice: $fee
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("uid", uid.to_string()))
            .bind(("now", now))
            .bind(("fee", entrance_fee))
            .bind(("extra_cost", extra_cost))
            .bind(("source", source.to_string()))
            .bind(("scanned_by", scanned_by))
            .await;

        let mut res = result.map_err(|e| TxnError::Store(e.to_string()))?;
        let errors = res.take_errors();
        if !errors.is_empty() {
            let msg = failure_text(errors);
            if msg.contains(THROWN_ALREADY_CHECKED_IN) {
                return Ok(OpenStayOutcome::AlreadyCheckedIn);
            }
            if msg.contains(THROWN_UNKNOWN_SUBJECT) {
                return Ok(OpenStayOutcome::UnknownSubject);
            }
            return Err(if is_conflict(&msg) {
                TxnError::Conflict(msg)
            } else {
                TxnError::Store(msg)
            });
        }

        let idx = res.num_statements() - 1;
        let opened: Option<StayOpened> =
            res.take(idx).map_err(|e| TxnError::Store(e.to_string()))?;
        opened
            .map(OpenStayOutcome::Opened)
            .ok_or_else(|| TxnError::Store("open_stay returned no result".to_string()))
    }

    /// Close a stay: flip the patron to not-staying, settle the open bill,
    /// and finalize the visit log with the stay duration, in one
    /// transaction.
    pub async fn close_stay(
        &self,
        uid: &str,
        source: &str,
        scanned_by: Option<String>,
    ) -> AppResult<CloseStayOutcome> {
        with_retry("close_stay", || {
            self.close_stay_txn(uid, source, scanned_by.clone())
        })
        .await
    }

    async fn close_stay_txn(
        &self,
        uid: &str,
        source: &str,
        scanned_by: Option<String>,
    ) -> Result<CloseStayOutcome, TxnError> {
        let now = now_millis();

        let result = self
            .db
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $patron = (SELECT * FROM type::thing('patron', $uid))[0];
                IF $patron == NONE { THROW 'unknown_subject' };
                IF !$patron.is_staying { THROW 'not_staying' };
                LET $bill = (SELECT * FROM stay_bill
                    WHERE owner = type::thing('patron', $uid) AND status = 'open'
                    LIMIT 1)[0];
                IF $bill == NONE { THROW 'missing_open_bill' };
                LET $minutes = math::max([0, <int> math::floor(($now - $bill.created_at) / 60000)]);
                UPDATE $bill.id SET
                    status = 'closed',
                    settled_at = $now,
                    updated_at = $now;
                UPDATE type::thing('patron', $uid) SET
                    is_staying = false,
                    last_check_out_at = $now;
                CREATE visit_log SET
                    patron = type::thing('patron', $uid),
                    action = 'checkout',
                    at = $now,
                    source = $source,
                    scanned_by = $scanned_by,
                    stay_minutes = $minutes;
                RETURN {
                    billId: <string> $bill.id,
                    patronName: $patron.display_name,
                    totalPrice: $bill.total_price,
                    itemCount: array::len($bill.items),
                    stayMinutes: $minutes,
                    settledAt: $now
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("uid", uid.to_string()))
            .bind(("now", now))
            .bind(("source", source.to_string()))
            .bind(("scanned_by", scanned_by))
            .await;

        let mut res = result.map_err(|e| TxnError::Store(e.to_string()))?;
        let errors = res.take_errors();
        if !errors.is_empty() {
            let msg = failure_text(errors);
            if msg.contains(THROWN_NOT_STAYING) {
                return Ok(CloseStayOutcome::NotStaying);
            }
            if msg.contains(THROWN_UNKNOWN_SUBJECT) {
                return Ok(CloseStayOutcome::UnknownSubject);
            }
            if msg.contains(THROWN_MISSING_OPEN_BILL) {
                // is_staying says a bill exists; its absence is data
                // corruption, not an operator mistake
                return Err(TxnError::Store(format!(
                    "patron {uid} is staying but has no open bill"
                )));
            }
            return Err(if is_conflict(&msg) {
                TxnError::Conflict(msg)
            } else {
                TxnError::Store(msg)
            });
        }

        let idx = res.num_statements() - 1;
        let summary: Option<SettlementSummary> =
            res.take(idx).map_err(|e| TxnError::Store(e.to_string()))?;
        summary
            .map(CloseStayOutcome::Closed)
            .ok_or_else(|| TxnError::Store("close_stay returned no result".to_string()))
    }

    /// Place an order batch on the patron's open bill
    ///
    /// One transaction: append lines and add to the bill total, increment
    /// today's ledger aggregate, and insert the ledger entry. Validation
    /// runs before the transaction starts and is never retried.
    pub async fn place_order(
        &self,
        uid: &str,
        items: &[OrderItemInput],
    ) -> AppResult<PlaceOrderOutcome> {
        if items.is_empty() {
            return Err(AppError::validation("items must not be empty"));
        }
        for item in items {
            item.validate()?;
        }

        let now = now_millis();
        let lines: Vec<BillItem> = items
            .iter()
            .map(|item| BillItem {
                menu_item_id: item.menu_item_id.clone(),
                category: item.category.clone(),
                name: item.name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                line_total: item.unit_price * item.quantity,
                ordered_at: now,
            })
            .collect();
        let batch_total: i64 = lines.iter().map(|l| l.line_total).sum();
        let date = current_venue_date(self.tz).to_string();

        with_retry("place_order", || {
            self.place_order_txn(uid, lines.clone(), batch_total, date.clone())
        })
        .await
    }

    async fn place_order_txn(
        &self,
        uid: &str,
        lines: Vec<BillItem>,
        batch_total: i64,
        date: String,
    ) -> Result<PlaceOrderOutcome, TxnError> {
        let now = now_millis();

        let result = self
            .db
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $bill = (SELECT * FROM stay_bill
                    WHERE owner = type::thing('patron', $uid) AND status = 'open'
                    LIMIT 1)[0];
                IF $bill == NONE { THROW 'not_checked_in' };
                UPDATE $bill.id SET
                    items += $lines,
                    total_price += $batch_total,
                    updated_at = $now;
                UPSERT type::thing('daily_ledger', $date) SET
                    date = $date,
                    order_count = (order_count ?? 0) + 1,
                    order_total = (order_total ?? 0) + $batch_total,
                    created_at = created_at ?? $now,
                    updated_at = $now;
                LET $entry = CREATE ledger_entry SET
                    ledger_date = $date,
                    patron = $bill.owner,
                    patron_name = $bill.patron_name,
                    items = $lines,
                    total = $batch_total,
                    current_table = $bill.current_table,
                    current_seat = $bill.current_seat,
                    status = 'preparing',
                    created_at = $now;
                RETURN {
                    billId: <string> $bill.id,
                    entryId: <string> $entry[0].id,
                    newTotal: $bill.total_price + $batch_total,
                    batchTotal: $batch_total
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("uid", uid.to_string()))
            .bind(("lines", lines))
            .bind(("batch_total", batch_total))
            .bind(("date", date))
            .bind(("now", now))
            .await;

        let mut res = result.map_err(|e| TxnError::Store(e.to_string()))?;
        let errors = res.take_errors();
        if !errors.is_empty() {
            let msg = failure_text(errors);
            if msg.contains(THROWN_NOT_CHECKED_IN) {
                return Ok(PlaceOrderOutcome::NotCheckedIn);
            }
            return Err(if is_conflict(&msg) {
                TxnError::Conflict(msg)
            } else {
                TxnError::Store(msg)
            });
        }

        let idx = res.num_statements() - 1;
        let placed: Option<OrderPlaced> =
            res.take(idx).map_err(|e| TxnError::Store(e.to_string()))?;
        placed
            .map(PlaceOrderOutcome::Placed)
            .ok_or_else(|| TxnError::Store("place_order returned no result".to_string()))
    }

    /// Operator view of currently open stays, sorted by display name.
    /// Plain read; eventual consistency is acceptable here.
    pub async fn list_open_stays(&self) -> AppResult<Vec<OpenStay>> {
        let mut result = self
            .db
            .query(
                "SELECT <string> id AS billId, <string> owner AS patronId, \
                     patron_name AS displayName, current_table AS currentTable, \
                     current_seat AS currentSeat, total_price AS totalPrice, \
                     created_at AS createdAt \
                 FROM stay_bill WHERE status = 'open' \
                 ORDER BY displayName ASC",
            )
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        result
            .take(0)
            .map_err(|e| AppError::database(e.to_string()))
    }
}
