//! Ledger Query Service
//!
//! Read-only views over the daily ledger and its entries. Nothing here
//! mutates state, so plain queries are enough; only the billing engine
//! writes these tables.


use serde::{Deserialize, Serialize};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::db::models::LedgerEntry;
use crate::utils::{AppError, AppResult, parse_date};

const ENTRY_SELECT: &str = "SELECT <string> id AS id, ledger_date, <string> patron AS patron, \
     patron_name, items, total, current_table, current_seat, status, created_at \
     FROM ledger_entry";

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 200;

/// Day aggregate for reporting; zeroes for days with no orders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: String,
    pub order_count: i64,
    pub order_total: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct LedgerTotalsRow {
    #[serde(default)]
    order_count: i64,
    #[serde(default)]
    order_total: i64,
}

/// Patron spend history over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatronHistory {
    /// Newest first, truncated to the requested limit
    pub entries: Vec<LedgerEntry>,
    /// Count over the whole range, not just the returned page
    pub total_count: i64,
    /// Amount over the whole range
    pub total_amount: i64,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryTotalsRow {
    #[serde(default)]
    total_count: i64,
    #[serde(default)]
    total_amount: i64,
}

/// Read-only ledger queries
#[derive(Clone)]
pub struct LedgerQuery {
    db: Surreal<Db>,
}

impl LedgerQuery {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    /// Day aggregate; a day with no orders reads as zeros, not an error
    pub async fn daily_summary(&self, date: &str) -> AppResult<DailySummary> {
        parse_date(date)?;

        let mut result = self
            .db
            .query("SELECT order_count, order_total FROM type::thing('daily_ledger', $date)")
            .bind(("date", date.to_string()))
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let rows: Vec<LedgerTotalsRow> = result
            .take(0)
            .map_err(|e| AppError::database(e.to_string()))?;
        let totals = rows.into_iter().next().unwrap_or(LedgerTotalsRow {
            order_count: 0,
            order_total: 0,
        });

        Ok(DailySummary {
            date: date.to_string(),
            order_count: totals.order_count,
            order_total: totals.order_total,
        })
    }

    /// All entries of a day, newest first
    pub async fn entries(&self, date: &str) -> AppResult<Vec<LedgerEntry>> {
        parse_date(date)?;

        let mut result = self
            .db
            .query(format!(
                "{ENTRY_SELECT} WHERE ledger_date = $date ORDER BY created_at DESC"
            ))
            .bind(("date", date.to_string()))
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        result
            .take(0)
            .map_err(|e| AppError::database(e.to_string()))
    }

    /// A patron's order history, newest first, with range totals
    ///
    /// `from`/`to` bound the ledger dates inclusively; either side may be
    /// open. The totals cover the whole range even when the entry page is
    /// truncated by `limit`.
    pub async fn patron_history(
        &self,
        uid: &str,
        from: Option<&str>,
        to: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<PatronHistory> {
        if let Some(from) = from {
            parse_date(from)?;
        }
        if let Some(to) = to {
            parse_date(to)?;
        }
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        // ISO dates compare correctly as strings
        let mut range = String::new();
        if from.is_some() {
            range.push_str(" AND ledger_date >= $from");
        }
        if to.is_some() {
            range.push_str(" AND ledger_date <= $to");
        }

        let mut result = self
            .db
            .query(format!(
                "{ENTRY_SELECT} WHERE patron = type::thing('patron', $uid){range} \
                 ORDER BY created_at DESC LIMIT $limit"
            ))
            .query(format!(
                "SELECT count() AS total_count, math::sum(total) AS total_amount \
                 FROM ledger_entry \
                 WHERE patron = type::thing('patron', $uid){range} GROUP ALL"
            ))
            .bind(("uid", uid.to_string()))
            .bind(("from", from.map(|s| s.to_string())))
            .bind(("to", to.map(|s| s.to_string())))
            .bind(("limit", limit as i64))
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let entries: Vec<LedgerEntry> = result
            .take(0)
            .map_err(|e| AppError::database(e.to_string()))?;
        let totals: Vec<HistoryTotalsRow> = result
            .take(1)
            .map_err(|e| AppError::database(e.to_string()))?;
        let totals = totals.into_iter().next().unwrap_or_default();

        Ok(PatronHistory {
            entries,
            total_count: totals.total_count,
            total_amount: totals.total_amount,
        })
    }
}
