//! Database Models
//!
//! Record ids cross the query boundary as plain `table:key` strings
//! (queries cast with `<string> id`), so models stay serde-plain and
//! serialize to API JSON without helpers. All timestamps are Unix millis.

pub mod ledger;
pub mod patron;
pub mod stay_bill;

pub use ledger::{DailyLedger, LedgerEntry};
pub use patron::{Patron, PatronRole, PatronStatus};
pub use stay_bill::{BillItem, BillStatus, ExtraCharge, StayBill};
