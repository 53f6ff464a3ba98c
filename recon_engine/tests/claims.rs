use chrono::Duration;
use recon_engine::{
    db_types::{Cents, ClaimOutcome, NewDeposit, NewOrder, OrderStatusType},
    test_utils::prepare_env::{fresh_database, hours_ago, tear_down},
    LedgerManagement,
    ReconciliationStore,
    SqliteDatabase,
    SqliteDatabaseError,
};

const ACCOUNT: &str = "partner-001";

fn window() -> Duration {
    Duration::hours(48)
}

async fn deposit(db: &SqliteDatabase, amount: &str) -> i64 {
    let deposit = NewDeposit::new(amount.parse::<Cents>().unwrap(), "Ana Souza", ACCOUNT);
    db.insert_deposit(deposit).await.expect("Error inserting deposit")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_exactly_one_winner() {
    let db = fresh_database().await;
    for n in [2usize, 8, 16] {
        let id = deposit(&db, "75.00").await;
        let mut tasks = Vec::with_capacity(n);
        for _ in 0..n {
            let db = db.clone();
            tasks.push(tokio::spawn(async move { db.try_claim_deposit(id).await.expect("Claim query failed") }));
        }
        let mut winners = 0;
        for task in tasks {
            if task.await.expect("Claim task panicked") {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "{n} concurrent claims on deposit #{id} produced {winners} winners");
        let stored = db.fetch_deposit(id).await.unwrap().unwrap();
        assert!(stored.claimed);
    }
    tear_down(db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_processes_racing_for_one_deposit() {
    let db = fresh_database().await;
    let id = deposit(&db, "10.00").await;
    // A second pool on the same file stands in for a second process.
    let other = SqliteDatabase::new_with_url(db.url(), 2).await.unwrap();
    let (a, b) = tokio::join!(db.try_claim_deposit(id), other.try_claim_deposit(id));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a ^ b, "expected exactly one success, got {a} and {b}");
    tear_down(db).await;
}

#[tokio::test]
async fn claimed_deposits_are_never_listed() {
    let db = fresh_database().await;
    let claimed = deposit(&db, "75.00").await;
    let open = deposit(&db, "80.00").await;
    assert!(db.try_claim_deposit(claimed).await.unwrap());
    let listed = db.fetch_unclaimed_deposits(ACCOUNT, window()).await.unwrap();
    assert_eq!(listed.iter().map(|d| d.id).collect::<Vec<_>>(), vec![open]);
    // A second claim on the same row is a routine "no"
    assert!(!db.try_claim_deposit(claimed).await.unwrap());
    // and so is a claim on a row that does not exist.
    assert!(!db.try_claim_deposit(9999).await.unwrap());
    tear_down(db).await;
}

#[tokio::test]
async fn deposit_listing_filters_account_and_window_and_is_ordered() {
    let db = fresh_database().await;
    let recent = db
        .insert_deposit(NewDeposit::new(Cents::from(100), "a", ACCOUNT).with_transaction_date(hours_ago(47)))
        .await
        .unwrap();
    let _stale = db
        .insert_deposit(NewDeposit::new(Cents::from(100), "b", ACCOUNT).with_transaction_date(hours_ago(49)))
        .await
        .unwrap();
    let _elsewhere = db.insert_deposit(NewDeposit::new(Cents::from(100), "c", "another-account")).await.unwrap();
    let newest = db.insert_deposit(NewDeposit::new(Cents::from(100), "d", ACCOUNT)).await.unwrap();
    let listed = db.fetch_unclaimed_deposits(ACCOUNT, window()).await.unwrap();
    assert_eq!(listed.iter().map(|d| d.id).collect::<Vec<_>>(), vec![recent, newest]);
    tear_down(db).await;
}

#[tokio::test]
async fn order_listing_filters_status_link_and_window() {
    let db = fresh_database().await;
    let pending = db.insert_order(NewOrder::new(Cents::from(100), "Ana")).await.unwrap();
    let _paid = db.insert_order(NewOrder::new(Cents::from(100), "Ana").with_status(OrderStatusType::Paid)).await.unwrap();
    let _stale = db.insert_order(NewOrder::new(Cents::from(100), "Ana").with_created_at(hours_ago(50))).await.unwrap();
    let linked = db.insert_order(NewOrder::new(Cents::from(100), "Ana")).await.unwrap();
    let d = deposit(&db, "1.00").await;
    assert!(db.try_claim_deposit(d).await.unwrap());
    db.link_order(linked, d).await.unwrap();

    let listed = db.fetch_unlinked_orders(window()).await.unwrap();
    assert_eq!(listed.iter().map(|o| o.id).collect::<Vec<_>>(), vec![pending]);
    tear_down(db).await;
}

#[tokio::test]
async fn stored_names_are_normalized() {
    let db = fresh_database().await;
    let id = db
        .insert_deposit(NewDeposit::new(Cents::from(5000), "  JOHN   Silva ", ACCOUNT).with_document(""))
        .await
        .unwrap();
    let stored = db.fetch_deposit(id).await.unwrap().unwrap();
    assert_eq!(stored.sender_name_normalized, "john silva");
    assert_eq!(stored.sender_document, None);
    assert_eq!(stored.amount, "50.00".parse().unwrap());
    assert!(!stored.claimed);
    tear_down(db).await;
}

#[tokio::test]
async fn link_requires_a_claimed_deposit_and_an_unlinked_order() {
    let db = fresh_database().await;
    let order = db.insert_order(NewOrder::new(Cents::from(100), "Ana")).await.unwrap();
    let d1 = deposit(&db, "1.00").await;
    let d2 = deposit(&db, "1.00").await;

    let err = db.link_order(order, d1).await.unwrap_err();
    assert!(matches!(err, SqliteDatabaseError::DepositNotClaimed(id) if id == d1), "{err}");

    assert!(db.try_claim_deposit(d1).await.unwrap());
    db.link_order(order, d1).await.unwrap();
    let stored = db.fetch_order(order).await.unwrap().unwrap();
    assert_eq!(stored.deposit_id, Some(d1));
    assert_eq!(db.fetch_order_for_deposit(d1).await.unwrap().map(|o| o.id), Some(order));

    assert!(db.try_claim_deposit(d2).await.unwrap());
    let err = db.link_order(order, d2).await.unwrap_err();
    assert!(matches!(err, SqliteDatabaseError::OrderAlreadyLinked(id) if id == order), "{err}");
    let err = db.link_order(4242, d2).await.unwrap_err();
    assert!(matches!(err, SqliteDatabaseError::OrderNotFound(4242)), "{err}");
    // The original link is untouched.
    assert_eq!(db.fetch_order(order).await.unwrap().unwrap().deposit_id, Some(d1));
    tear_down(db).await;
}

#[tokio::test]
async fn claim_and_link_commits_both_writes_or_neither() {
    let db = fresh_database().await;
    let order = db.insert_order(NewOrder::new(Cents::from(100), "Ana")).await.unwrap();
    let d1 = deposit(&db, "1.00").await;
    let d2 = deposit(&db, "1.00").await;

    assert_eq!(db.claim_and_link(d1, order).await.unwrap(), ClaimOutcome::Linked);
    assert!(db.fetch_deposit(d1).await.unwrap().unwrap().claimed);
    assert_eq!(db.fetch_order(order).await.unwrap().unwrap().deposit_id, Some(d1));

    // The order is gone: the claim on d2 is rolled back with it.
    assert_eq!(db.claim_and_link(d2, order).await.unwrap(), ClaimOutcome::OrderUnavailable);
    assert!(!db.fetch_deposit(d2).await.unwrap().unwrap().claimed);
    assert_eq!(db.claim_and_link(d2, 4242).await.unwrap(), ClaimOutcome::OrderUnavailable);
    assert!(!db.fetch_deposit(d2).await.unwrap().unwrap().claimed);

    // A deposit that is already claimed never touches the order.
    let spare = db.insert_order(NewOrder::new(Cents::from(100), "Ana")).await.unwrap();
    assert_eq!(db.claim_and_link(d1, spare).await.unwrap(), ClaimOutcome::DepositTaken);
    assert_eq!(db.fetch_order(spare).await.unwrap().unwrap().deposit_id, None);
    assert!(db.fetch_orphaned_claims().await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claim_and_link_on_one_order_has_one_winner() {
    let db = fresh_database().await;
    let order = db.insert_order(NewOrder::new(Cents::from(500), "Ana")).await.unwrap();
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let id = deposit(&db, "5.00").await;
        let db = db.clone();
        tasks.push(tokio::spawn(async move { db.claim_and_link(id, order).await.expect("Claim and link failed") }));
    }
    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.expect("Claim task panicked"));
    }
    assert_eq!(outcomes.iter().filter(|o| **o == ClaimOutcome::Linked).count(), 1, "{outcomes:?}");
    assert!(outcomes.iter().all(|o| matches!(o, ClaimOutcome::Linked | ClaimOutcome::OrderUnavailable)));
    assert!(db.fetch_orphaned_claims().await.unwrap().is_empty());
    assert_eq!(db.fetch_unclaimed_deposits(ACCOUNT, window()).await.unwrap().len(), 7);
    tear_down(db).await;
}

#[tokio::test]
async fn orphaned_claims_are_reported() {
    let db = fresh_database().await;
    let order = db.insert_order(NewOrder::new(Cents::from(100), "Ana")).await.unwrap();
    let linked = deposit(&db, "1.00").await;
    let orphan = deposit(&db, "1.00").await;
    let _untouched = deposit(&db, "1.00").await;
    assert!(db.try_claim_deposit(linked).await.unwrap());
    db.link_order(order, linked).await.unwrap();
    assert!(db.try_claim_deposit(orphan).await.unwrap());

    let orphans = db.fetch_orphaned_claims().await.unwrap();
    assert_eq!(orphans.iter().map(|d| d.id).collect::<Vec<_>>(), vec![orphan]);
    tear_down(db).await;
}

#[tokio::test]
async fn a_claim_cannot_be_released() {
    let db = fresh_database().await;
    let id = deposit(&db, "1.00").await;
    assert!(db.try_claim_deposit(id).await.unwrap());
    let result = sqlx::query("UPDATE deposits SET claimed = 0 WHERE id = $1").bind(id).execute(db.pool()).await;
    assert!(result.is_err(), "releasing a claim must be rejected by the database");
    assert!(db.fetch_deposit(id).await.unwrap().unwrap().claimed);
    tear_down(db).await;
}
