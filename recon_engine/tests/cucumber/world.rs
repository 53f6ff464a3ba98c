use std::collections::HashMap;

use cucumber::World;
use log::*;
use recon_engine::{
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CycleReport,
    DepositMatcher,
    MatchSettings,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct ReconWorld {
    pub system: Option<ReconSystem>,
}

#[derive(Debug)]
pub struct ReconSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub matcher: DepositMatcher<SqliteDatabase>,
    /// Scenario labels mapped to store ids.
    pub deposits: HashMap<String, i64>,
    pub orders: HashMap<String, i64>,
    pub last_report: Option<CycleReport>,
    pub claim_results: Vec<bool>,
}

impl ReconWorld {
    pub fn system(&mut self) -> &mut ReconSystem {
        self.system.as_mut().expect("Reconciliation system not initialised")
    }
}

impl ReconSystem {
    pub async fn new(account: &str) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let matcher = DepositMatcher::new(db.clone(), MatchSettings::new(account), Default::default());
        Self {
            db_path: url,
            db,
            matcher,
            deposits: HashMap::new(),
            orders: HashMap::new(),
            last_report: None,
            claim_results: Vec::new(),
        }
    }

    pub fn deposit_id(&self, label: &str) -> i64 {
        *self.deposits.get(label).unwrap_or_else(|| panic!("Unknown deposit [{label}]"))
    }

    pub fn order_id(&self, label: &str) -> i64 {
        *self.orders.get(label).unwrap_or_else(|| panic!("Unknown order [{label}]"))
    }

    pub fn report(&self) -> CycleReport {
        self.last_report.expect("No cycle has been run")
    }
}
