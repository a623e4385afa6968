use super::*;
use crate::auth::hash_pin;
use crate::billing::BillingEngine;
use crate::credential::{CredentialConfig, QrCredential};
use crate::db::DbService;
use crate::db::models::PatronRole;
use crate::db::repository::PatronCreate;

async fn setup() -> (SessionMachine, Arc<CredentialCodec>, PatronRepository) {
    let db = DbService::memory().await.expect("Failed to open database");
    let codec = Arc::new(CredentialCodec::new(&CredentialConfig {
        secret: "test-secret-key-for-credentials".to_string(),
    }));
    let patrons = PatronRepository::new(db.db.clone());
    let billing = BillingEngine::new(db.db.clone(), chrono_tz::UTC);
    let machine = SessionMachine::new(codec.clone(), patrons.clone(), billing);
    (machine, codec, patrons)
}

async fn seed(patrons: &PatronRepository, uid: &str, name: &str, pin: &str, role: PatronRole) {
    patrons
        .create(PatronCreate {
            uid: uid.to_string(),
            login_id: format!("{uid}_0101"),
            display_name: name.to_string(),
            pin_hash: hash_pin(pin).expect("Failed to hash PIN"),
            role,
        })
        .await
        .expect("Failed to seed patron");
}

fn payload(codec: &CredentialCodec, uid: &str, kind: CredentialKind) -> String {
    let cred = codec
        .issue(uid, &format!("{uid}_0101"), kind)
        .expect("Failed to issue credential");
    codec.encode(&cred).expect("Failed to encode credential")
}

#[tokio::test]
async fn test_qr_check_in_and_status() {
    let (machine, codec, patrons) = setup().await;
    seed(&patrons, "u1", "Alice", "1234", PatronRole::Patron).await;

    let payload = payload(&codec, "u1", CredentialKind::Patron);
    let outcome = machine
        .check_in(&payload, 1000, None, Some("desk1".to_string()))
        .await
        .unwrap();

    let CheckInOutcome::CheckedIn(opened) = outcome else {
        panic!("Expected CheckedIn, got {outcome:?}");
    };
    assert_eq!(opened.total_price, 1000);

    let status = machine.status("u1").await.unwrap().unwrap();
    assert!(status.is_staying);
    assert_eq!(status.display_name, "Alice");
}

#[tokio::test]
async fn test_check_in_twice() {
    let (machine, codec, patrons) = setup().await;
    seed(&patrons, "u1", "Alice", "1234", PatronRole::Patron).await;

    let payload = payload(&codec, "u1", CredentialKind::Patron);
    machine.check_in(&payload, 0, None, None).await.unwrap();
    let second = machine.check_in(&payload, 0, None, None).await.unwrap();

    assert!(matches!(second, CheckInOutcome::AlreadyCheckedIn));
}

#[tokio::test]
async fn test_invalid_payloads_rejected() {
    let (machine, codec, patrons) = setup().await;
    seed(&patrons, "u1", "Alice", "1234", PatronRole::Patron).await;

    let outcome = machine.check_in("not json", 0, None, None).await.unwrap();
    assert!(matches!(outcome, CheckInOutcome::InvalidCredential));

    // Forged uid breaks the signature
    let cred = codec
        .issue("u1", "u1_0101", CredentialKind::Patron)
        .unwrap();
    let forged = QrCredential {
        uid: "u2".to_string(),
        ..cred
    };
    let forged_payload = codec.encode(&forged).unwrap();
    let outcome = machine.check_in(&forged_payload, 0, None, None).await.unwrap();
    assert!(matches!(outcome, CheckInOutcome::InvalidCredential));
}

#[tokio::test]
async fn test_staff_credential_wrong_kind() {
    let (machine, codec, patrons) = setup().await;
    seed(&patrons, "s1", "Desk", "1234", PatronRole::Staff).await;

    let payload = payload(&codec, "s1", CredentialKind::Staff);
    let check_in = machine.check_in(&payload, 0, None, None).await.unwrap();
    assert!(matches!(check_in, CheckInOutcome::WrongKind));

    let check_out = machine.check_out(&payload, None).await.unwrap();
    assert!(matches!(check_out, CheckOutOutcome::WrongKind));
}

#[tokio::test]
async fn test_valid_credential_unknown_patron() {
    let (machine, codec, _patrons) = setup().await;

    let payload = payload(&codec, "ghost", CredentialKind::Patron);
    let outcome = machine.check_in(&payload, 0, None, None).await.unwrap();
    assert!(matches!(outcome, CheckInOutcome::UnknownSubject));
}

#[tokio::test]
async fn test_check_out_flow() {
    let (machine, codec, patrons) = setup().await;
    seed(&patrons, "u1", "Alice", "1234", PatronRole::Patron).await;

    let payload = payload(&codec, "u1", CredentialKind::Patron);

    let early = machine.check_out(&payload, None).await.unwrap();
    assert!(matches!(early, CheckOutOutcome::NotStaying));

    machine.check_in(&payload, 500, None, None).await.unwrap();
    let outcome = machine.check_out(&payload, None).await.unwrap();
    let CheckOutOutcome::CheckedOut(summary) = outcome else {
        panic!("Expected CheckedOut, got {outcome:?}");
    };
    assert_eq!(summary.total_price, 500);

    let status = machine.status("u1").await.unwrap().unwrap();
    assert!(!status.is_staying);
}

#[tokio::test]
async fn test_manual_check_in() {
    let (machine, _codec, patrons) = setup().await;
    seed(&patrons, "u1", "Alice", "1234", PatronRole::Patron).await;

    let outcome = machine
        .manual_check_in("u1_0101", "1234", 800, None, Some("desk".to_string()))
        .await
        .unwrap();
    let ManualCheckInOutcome::CheckedIn(opened) = outcome else {
        panic!("Expected CheckedIn, got {outcome:?}");
    };
    assert_eq!(opened.total_price, 800);

    let again = machine
        .manual_check_in("u1_0101", "1234", 800, None, None)
        .await
        .unwrap();
    assert!(matches!(again, ManualCheckInOutcome::AlreadyCheckedIn));
}

#[tokio::test]
async fn test_manual_check_in_bad_login_and_pin() {
    let (machine, _codec, patrons) = setup().await;
    seed(&patrons, "u1", "Alice", "1234", PatronRole::Patron).await;

    let wrong_pin = machine
        .manual_check_in("u1_0101", "4321", 0, None, None)
        .await
        .unwrap();
    assert!(matches!(wrong_pin, ManualCheckInOutcome::InvalidLogin));

    let unknown = machine
        .manual_check_in("nobody_0101", "1234", 0, None, None)
        .await
        .unwrap();
    assert!(matches!(unknown, ManualCheckInOutcome::InvalidLogin));
}

#[tokio::test]
async fn test_status_unknown_patron() {
    let (machine, _codec, _patrons) = setup().await;
    assert!(machine.status("ghost").await.unwrap().is_none());
}
