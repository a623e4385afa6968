//! Time helpers - venue timezone conversion
//!
//! Timestamps are Unix millis (`i64`) everywhere in the data model and at
//! every interface boundary. Date strings (YYYY-MM-DD) appear only as ledger
//! keys and API parameters, and are always interpreted in the venue timezone.

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Current calendar date in the venue timezone
///
/// The daily ledger is keyed by this date, so two orders placed either side
/// of midnight venue time land in different ledgers regardless of UTC.
pub fn current_venue_date(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2026-08-27").is_ok());
        assert!(parse_date("2026/08/27").is_err());
        assert!(parse_date("not-a-date").is_err());
    }
}
