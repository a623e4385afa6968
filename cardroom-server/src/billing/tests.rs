use serde::Deserialize;

use super::*;
use crate::db::DbService;
use crate::db::models::PatronRole;
use crate::db::repository::{PatronCreate, PatronRepository};
use crate::utils::current_venue_date;

const TZ: Tz = chrono_tz::UTC;

async fn setup() -> (DbService, BillingEngine, PatronRepository) {
    let db = DbService::memory().await.expect("Failed to open database");
    let engine = BillingEngine::new(db.db.clone(), TZ);
    let patrons = PatronRepository::new(db.db.clone());
    (db, engine, patrons)
}

async fn seed_patron(patrons: &PatronRepository, uid: &str, name: &str) {
    patrons
        .create(PatronCreate {
            uid: uid.to_string(),
            login_id: format!("{uid}_0101"),
            display_name: name.to_string(),
            pin_hash: "unused".to_string(),
            role: PatronRole::Patron,
        })
        .await
        .expect("Failed to seed patron");
}

fn item(name: &str, unit_price: i64, quantity: i64) -> OrderItemInput {
    OrderItemInput {
        menu_item_id: format!("menu_{name}"),
        category: "drink".to_string(),
        name: name.to_string(),
        unit_price,
        quantity,
    }
}

#[derive(Debug, Deserialize)]
struct LedgerTotals {
    order_count: i64,
    order_total: i64,
}

async fn ledger_totals(db: &DbService) -> Option<LedgerTotals> {
    let date = current_venue_date(TZ).to_string();
    let mut result = db
        .db
        .query("SELECT order_count, order_total FROM type::thing('daily_ledger', $date)")
        .bind(("date", date))
        .await
        .expect("Failed to query ledger");
    let rows: Vec<LedgerTotals> = result.take(0).expect("Failed to read ledger");
    rows.into_iter().next()
}

#[tokio::test]
async fn test_open_stay_seeds_entrance_fee() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;

    let outcome = engine
        .open_stay("u1", 1500, None, "qr", None)
        .await
        .expect("Failed to open stay");

    let OpenStayOutcome::Opened(opened) = outcome else {
        panic!("Expected Opened, got {outcome:?}");
    };
    assert_eq!(opened.patron_name, "Alice");
    assert_eq!(opened.total_price, 1500);
    assert!(opened.bill_id.starts_with("stay_bill:"));

    let patron = patrons.find_by_uid("u1").await.unwrap().unwrap();
    assert!(patron.is_staying);
    assert!(patron.last_check_in_at.is_some());
}

#[tokio::test]
async fn test_open_stay_twice_is_rejected() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;

    engine.open_stay("u1", 0, None, "qr", None).await.unwrap();
    let second = engine.open_stay("u1", 0, None, "qr", None).await.unwrap();

    assert!(matches!(second, OpenStayOutcome::AlreadyCheckedIn));

    // Only one open bill exists
    let open = engine.list_open_stays().await.unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn test_open_stay_unknown_patron() {
    let (_db, engine, _patrons) = setup().await;

    let outcome = engine.open_stay("ghost", 0, None, "qr", None).await.unwrap();
    assert!(matches!(outcome, OpenStayOutcome::UnknownSubject));
}

#[tokio::test]
async fn test_open_stay_negative_fee_rejected() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;

    let err = engine.open_stay("u1", -100, None, "qr", None).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_place_order_requires_open_stay() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;

    let outcome = engine
        .place_order("u1", &[item("Beer", 800, 1)])
        .await
        .unwrap();
    assert!(matches!(outcome, PlaceOrderOutcome::NotCheckedIn));
}

#[tokio::test]
async fn test_place_order_updates_bill_and_ledger() {
    let (db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;
    engine.open_stay("u1", 1000, None, "qr", None).await.unwrap();

    let outcome = engine
        .place_order("u1", &[item("Beer", 1000, 1), item("Nuts", 300, 2)])
        .await
        .unwrap();

    let PlaceOrderOutcome::Placed(placed) = outcome else {
        panic!("Expected Placed, got {outcome:?}");
    };
    assert_eq!(placed.batch_total, 1600);
    assert_eq!(placed.new_total, 2600); // 1000 entrance fee + 1600
    assert!(placed.entry_id.starts_with("ledger_entry:"));

    let totals = ledger_totals(&db).await.expect("Ledger row missing");
    assert_eq!(totals.order_count, 1);
    assert_eq!(totals.order_total, 1600);
}

#[tokio::test]
async fn test_ledger_accumulates_across_orders() {
    let (db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;
    seed_patron(&patrons, "u2", "Bob").await;
    engine.open_stay("u1", 0, None, "qr", None).await.unwrap();
    engine.open_stay("u2", 0, None, "qr", None).await.unwrap();

    engine.place_order("u1", &[item("Beer", 800, 1)]).await.unwrap();
    engine.place_order("u2", &[item("Wine", 1200, 1)]).await.unwrap();

    let totals = ledger_totals(&db).await.expect("Ledger row missing");
    assert_eq!(totals.order_count, 2);
    assert_eq!(totals.order_total, 2000);
}

#[tokio::test]
async fn test_place_order_validation() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;
    engine.open_stay("u1", 0, None, "qr", None).await.unwrap();

    assert!(engine.place_order("u1", &[]).await.is_err());
    assert!(engine.place_order("u1", &[item("Beer", 800, 0)]).await.is_err());
    assert!(engine.place_order("u1", &[item("Beer", -1, 1)]).await.is_err());
    assert!(
        engine
            .place_order("u1", &[item("", 800, 1)])
            .await
            .is_err()
    );

    // Nothing landed on the bill or the ledger
    let open = engine.list_open_stays().await.unwrap();
    assert_eq!(open[0].total_price, 0);
}

#[tokio::test]
async fn test_close_stay_settles_bill() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;
    engine.open_stay("u1", 500, None, "qr", None).await.unwrap();
    engine.place_order("u1", &[item("Beer", 800, 2)]).await.unwrap();

    let outcome = engine.close_stay("u1", "qr", None).await.unwrap();
    let CloseStayOutcome::Closed(summary) = outcome else {
        panic!("Expected Closed, got {outcome:?}");
    };
    assert_eq!(summary.total_price, 2100); // 500 fee + 1600 items
    assert_eq!(summary.item_count, 1);
    assert_eq!(summary.stay_minutes, 0);
    assert!(summary.settled_at > 0);

    let patron = patrons.find_by_uid("u1").await.unwrap().unwrap();
    assert!(!patron.is_staying);
    assert!(patron.last_check_out_at.is_some());

    assert!(engine.list_open_stays().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_rule_outcomes_are_not_errors() {
    // Wrong-state aborts happen mid-transaction, after earlier statements
    // have already run. Each one must come back as a tagged outcome, never
    // as a store error.
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;
    engine.open_stay("u1", 0, None, "qr", None).await.unwrap();

    let second = engine.open_stay("u1", 0, None, "qr", None).await;
    assert!(matches!(second, Ok(OpenStayOutcome::AlreadyCheckedIn)));

    seed_patron(&patrons, "u2", "Bob").await;
    let order = engine.place_order("u2", &[item("Beer", 800, 1)]).await;
    assert!(matches!(order, Ok(PlaceOrderOutcome::NotCheckedIn)));

    let close = engine.close_stay("u2", "qr", None).await;
    assert!(matches!(close, Ok(CloseStayOutcome::NotStaying)));

    let ghost = engine.open_stay("ghost", 0, None, "qr", None).await;
    assert!(matches!(ghost, Ok(OpenStayOutcome::UnknownSubject)));
}

#[tokio::test]
async fn test_close_stay_when_not_staying() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;

    let outcome = engine.close_stay("u1", "qr", None).await.unwrap();
    assert!(matches!(outcome, CloseStayOutcome::NotStaying));

    let unknown = engine.close_stay("ghost", "qr", None).await.unwrap();
    assert!(matches!(unknown, CloseStayOutcome::UnknownSubject));
}

#[tokio::test]
async fn test_reopen_after_close_starts_fresh_bill() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;

    engine.open_stay("u1", 500, None, "qr", None).await.unwrap();
    engine.place_order("u1", &[item("Beer", 800, 1)]).await.unwrap();
    engine.close_stay("u1", "qr", None).await.unwrap();

    let outcome = engine.open_stay("u1", 500, None, "qr", None).await.unwrap();
    let OpenStayOutcome::Opened(opened) = outcome else {
        panic!("Expected Opened, got {outcome:?}");
    };
    // Fresh bill carries only the new entrance fee
    assert_eq!(opened.total_price, 500);
}

#[tokio::test]
async fn test_list_open_stays_sorted_by_name() {
    let (_db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Charlie").await;
    seed_patron(&patrons, "u2", "Alice").await;
    seed_patron(&patrons, "u3", "Bob").await;

    for uid in ["u1", "u2", "u3"] {
        engine.open_stay(uid, 0, None, "qr", None).await.unwrap();
    }

    let open = engine.list_open_stays().await.unwrap();
    let names: Vec<&str> = open.iter().map(|s| s.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
    assert_eq!(open[0].patron_id, "patron:u2");
}

#[tokio::test]
async fn test_concurrent_orders_both_land() {
    let (db, engine, patrons) = setup().await;
    seed_patron(&patrons, "u1", "Alice").await;
    engine.open_stay("u1", 0, None, "qr", None).await.unwrap();

    // Two writers racing on the same bill and the same ledger row. The
    // conflict-retry loop must make both batches stick.
    let items_a = [item("Beer", 1000, 1)];
    let items_b = [item("Wine", 1000, 1)];
    let a = engine.place_order("u1", &items_a);
    let b = engine.place_order("u1", &items_b);
    let (ra, rb) = futures::join!(a, b);

    assert!(matches!(ra.unwrap(), PlaceOrderOutcome::Placed(_)));
    assert!(matches!(rb.unwrap(), PlaceOrderOutcome::Placed(_)));

    let open = engine.list_open_stays().await.unwrap();
    assert_eq!(open[0].total_price, 2000);

    let totals = ledger_totals(&db).await.expect("Ledger row missing");
    assert_eq!(totals.order_count, 2);
    assert_eq!(totals.order_total, 2000);
}
