use cucumber::{given, then, when};
use recon_engine::{
    db_types::{Cents, NewDeposit, NewOrder},
    LedgerManagement,
    ReconciliationStore,
    SqliteDatabase,
};

use crate::cucumber::ReconWorld;

fn amount(s: &str) -> Cents {
    s.parse().unwrap_or_else(|e| panic!("Invalid amount {s}: {e}"))
}

#[given(expr = "deposit [{word}] of {word} from {string} into {string}")]
async fn deposit(world: &mut ReconWorld, label: String, value: String, sender: String, account: String) {
    add_deposit(world, label, NewDeposit::new(amount(&value), sender, account)).await;
}

#[given(expr = "deposit [{word}] of {word} from {string} into {string} with document {string}")]
async fn deposit_with_document(
    world: &mut ReconWorld,
    label: String,
    value: String,
    sender: String,
    account: String,
    document: String,
) {
    add_deposit(world, label, NewDeposit::new(amount(&value), sender, account).with_document(document)).await;
}

async fn add_deposit(world: &mut ReconWorld, label: String, deposit: NewDeposit) {
    let sys = world.system();
    let id = sys.db.insert_deposit(deposit).await.expect("Error inserting deposit");
    sys.deposits.insert(label, id);
}

#[given(expr = "order [{word}] of {word} from {string}")]
async fn order(world: &mut ReconWorld, label: String, value: String, payer: String) {
    add_order(world, label, NewOrder::new(amount(&value), payer)).await;
}

#[given(expr = "order [{word}] of {word} from {string} with document {string}")]
async fn order_with_document(world: &mut ReconWorld, label: String, value: String, payer: String, document: String) {
    add_order(world, label, NewOrder::new(amount(&value), payer).with_document(document)).await;
}

async fn add_order(world: &mut ReconWorld, label: String, order: NewOrder) {
    let sys = world.system();
    let id = sys.db.insert_order(order).await.expect("Error inserting order");
    sys.orders.insert(label, id);
}

#[given(expr = "deposit [{word}] has already been claimed")]
async fn already_claimed(world: &mut ReconWorld, label: String) {
    let sys = world.system();
    let id = sys.deposit_id(&label);
    assert!(sys.db.try_claim_deposit(id).await.expect("Error claiming deposit"));
}

#[when("the matcher runs a cycle")]
async fn run_cycle(world: &mut ReconWorld) {
    let sys = world.system();
    let report = sys.matcher.run_cycle().await.expect("Cycle failed");
    sys.last_report = Some(report);
}

#[when(expr = "two processes race to claim deposit [{word}]")]
async fn race_for_claim(world: &mut ReconWorld, label: String) {
    let sys = world.system();
    let id = sys.deposit_id(&label);
    let other = SqliteDatabase::new_with_url(&sys.db_path, 2).await.expect("Error opening second connection pool");
    let (a, b) = tokio::join!(sys.db.try_claim_deposit(id), other.try_claim_deposit(id));
    sys.claim_results = vec![a.expect("Claim query failed"), b.expect("Claim query failed")];
}

#[then(expr = "order [{word}] is funded by deposit [{word}]")]
async fn order_is_funded(world: &mut ReconWorld, order: String, deposit: String) {
    let sys = world.system();
    let stored = sys.db.fetch_order(sys.order_id(&order)).await.expect("Error fetching order").expect("No such order");
    assert_eq!(stored.deposit_id, Some(sys.deposit_id(&deposit)));
}

#[then(expr = "order [{word}] is still unlinked")]
async fn order_is_unlinked(world: &mut ReconWorld, order: String) {
    let sys = world.system();
    let stored = sys.db.fetch_order(sys.order_id(&order)).await.expect("Error fetching order").expect("No such order");
    assert!(stored.is_unlinked(), "order [{order}] is linked to {:?}", stored.deposit_id);
}

#[then(expr = "deposit [{word}] is claimed")]
async fn deposit_is_claimed(world: &mut ReconWorld, label: String) {
    assert!(claimed(world, &label).await);
}

#[then(expr = "deposit [{word}] is unclaimed")]
async fn deposit_is_unclaimed(world: &mut ReconWorld, label: String) {
    assert!(!claimed(world, &label).await);
}

async fn claimed(world: &mut ReconWorld, label: &str) -> bool {
    let sys = world.system();
    let deposit = sys.db.fetch_deposit(sys.deposit_id(label)).await.expect("Error fetching deposit");
    deposit.expect("No such deposit").claimed
}

#[then(expr = "the cycle scanned {int} deposit(s) and linked {int} order(s)")]
async fn cycle_counts(world: &mut ReconWorld, scanned: usize, linked: usize) {
    let report = world.system().report();
    assert_eq!(report.deposits_scanned, scanned, "{report}");
    assert_eq!(report.matches_committed, linked, "{report}");
}

#[then("exactly one claim succeeded")]
async fn one_claim_won(world: &mut ReconWorld) {
    let results = &world.system().claim_results;
    assert_eq!(results.iter().filter(|r| **r).count(), 1, "claim results: {results:?}");
}
