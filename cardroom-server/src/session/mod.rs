//! Check-In Session State Machine
//!
//! Gatekeeping in front of the billing engine: scanned payloads are
//! verified by the [credential codec](crate::credential), manual check-ins
//! are authenticated by login id + PIN, and only then does the billing
//! engine get to mutate state. Presence transitions themselves are atomic
//! inside the engine; this layer never touches `is_staying` directly.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::auth::verify_pin;
use crate::billing::{
    BillingEngine, CloseStayOutcome, OpenStayOutcome, SettlementSummary, StayOpened,
};
use crate::credential::{CredentialCodec, CredentialKind};
use crate::db::models::PatronStatus;
use crate::db::repository::PatronRepository;
use crate::utils::AppResult;

/// Where a presence transition originated
pub const SOURCE_QR: &str = "qr";
pub const SOURCE_MANUAL: &str = "manual";

#[derive(Debug)]
pub enum CheckInOutcome {
    CheckedIn(StayOpened),
    AlreadyCheckedIn,
    /// Malformed, expired, or forged payload - never distinguished
    InvalidCredential,
    /// Valid credential of the wrong kind (a staff badge at the patron gate)
    WrongKind,
    /// Valid credential for a subject this venue does not know
    UnknownSubject,
}

#[derive(Debug)]
pub enum CheckOutOutcome {
    CheckedOut(SettlementSummary),
    NotStaying,
    InvalidCredential,
    WrongKind,
    UnknownSubject,
}

#[derive(Debug)]
pub enum ManualCheckInOutcome {
    CheckedIn(StayOpened),
    AlreadyCheckedIn,
    /// Unknown login id or wrong PIN - never distinguished
    InvalidLogin,
}

/// The session state machine
#[derive(Clone)]
pub struct SessionMachine {
    codec: Arc<CredentialCodec>,
    patrons: PatronRepository,
    billing: BillingEngine,
}

impl SessionMachine {
    pub fn new(
        codec: Arc<CredentialCodec>,
        patrons: PatronRepository,
        billing: BillingEngine,
    ) -> Self {
        Self {
            codec,
            patrons,
            billing,
        }
    }

    /// Check in from a scanned payload
    pub async fn check_in(
        &self,
        payload: &str,
        entrance_fee: i64,
        fee_description: Option<String>,
        scanned_by: Option<String>,
    ) -> AppResult<CheckInOutcome> {
        let Some(credential) = self.codec.verify_decode(payload) else {
            tracing::info!("Check-in rejected: invalid credential");
            return Ok(CheckInOutcome::InvalidCredential);
        };
        if credential.kind != CredentialKind::Patron {
            tracing::info!(uid = %credential.uid, "Check-in rejected: staff credential");
            return Ok(CheckInOutcome::WrongKind);
        }

        let outcome = self
            .billing
            .open_stay(
                &credential.uid,
                entrance_fee,
                fee_description,
                SOURCE_QR,
                scanned_by,
            )
            .await?;

        Ok(match outcome {
            OpenStayOutcome::Opened(opened) => {
                tracing::info!(uid = %credential.uid, bill = %opened.bill_id, "Checked in");
                CheckInOutcome::CheckedIn(opened)
            }
            OpenStayOutcome::AlreadyCheckedIn => CheckInOutcome::AlreadyCheckedIn,
            OpenStayOutcome::UnknownSubject => {
                tracing::warn!(uid = %credential.uid, "Valid credential for unknown patron");
                CheckInOutcome::UnknownSubject
            }
        })
    }

    /// Check out from a scanned payload
    pub async fn check_out(
        &self,
        payload: &str,
        scanned_by: Option<String>,
    ) -> AppResult<CheckOutOutcome> {
        let Some(credential) = self.codec.verify_decode(payload) else {
            tracing::info!("Check-out rejected: invalid credential");
            return Ok(CheckOutOutcome::InvalidCredential);
        };
        if credential.kind != CredentialKind::Patron {
            return Ok(CheckOutOutcome::WrongKind);
        }

        let outcome = self
            .billing
            .close_stay(&credential.uid, SOURCE_QR, scanned_by)
            .await?;

        Ok(match outcome {
            CloseStayOutcome::Closed(summary) => {
                tracing::info!(uid = %credential.uid, total = summary.total_price, "Checked out");
                CheckOutOutcome::CheckedOut(summary)
            }
            CloseStayOutcome::NotStaying => CheckOutOutcome::NotStaying,
            CloseStayOutcome::UnknownSubject => CheckOutOutcome::UnknownSubject,
        })
    }

    /// Manual check-in at the desk: login id plus 4-digit PIN
    ///
    /// Unknown login and wrong PIN collapse into one outcome so the desk
    /// terminal cannot be used to enumerate accounts.
    pub async fn manual_check_in(
        &self,
        login_id: &str,
        pin: &str,
        entrance_fee: i64,
        fee_description: Option<String>,
        operator: Option<String>,
    ) -> AppResult<ManualCheckInOutcome> {
        let Some(patron) = self.patrons.find_by_login_id(login_id).await? else {
            tracing::info!(login_id, "Manual check-in rejected: unknown login");
            return Ok(ManualCheckInOutcome::InvalidLogin);
        };

        if !verify_pin(pin, &patron.pin_hash) {
            tracing::info!(login_id, "Manual check-in rejected: wrong PIN");
            return Ok(ManualCheckInOutcome::InvalidLogin);
        }

        let Some(id) = patron.id.as_deref() else {
            return Err(crate::utils::AppError::internal("Patron record has no id"));
        };
        let uid = id.strip_prefix("patron:").unwrap_or(id);

        let outcome = self
            .billing
            .open_stay(uid, entrance_fee, fee_description, SOURCE_MANUAL, operator)
            .await?;

        Ok(match outcome {
            OpenStayOutcome::Opened(opened) => {
                tracing::info!(uid, bill = %opened.bill_id, "Manually checked in");
                ManualCheckInOutcome::CheckedIn(opened)
            }
            OpenStayOutcome::AlreadyCheckedIn => ManualCheckInOutcome::AlreadyCheckedIn,
            // The login lookup just found this patron
            OpenStayOutcome::UnknownSubject => {
                return Err(crate::utils::AppError::internal(format!(
                    "Patron {uid} vanished between lookup and check-in"
                )));
            }
        })
    }

    /// Presence status lookup, `None` for unknown patrons
    pub async fn status(&self, uid: &str) -> AppResult<Option<PatronStatus>> {
        Ok(self.patrons.status(uid).await?)
    }
}
