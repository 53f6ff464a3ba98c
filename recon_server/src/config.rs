//! Server configuration
//!
//! Everything is read from environment variables (after `.env` has been loaded). A missing or unparseable value logs
//! a 🪛️ line and falls back to its default, so the server always starts. The one value without a usable default is
//! `RECON_TARGET_ACCOUNT`: without it the linker still runs, but every cycle is skipped.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use recon_common::{parse_boolean_flag, Secret};
use recon_engine::{matcher::DEFAULT_MATCH_WINDOW_HOURS, MatchSettings};

const DEFAULT_RECON_HOST: &str = "127.0.0.1";
const DEFAULT_RECON_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/recon_store.db";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_CYCLE_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct LinkerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Secret<String>,
    /// The receiving account whose deposits are eligible for matching.
    pub target_account: Option<String>,
    /// Time between the start of two consecutive cycles.
    pub poll_interval: Duration,
    /// Deposits and orders older than this are never candidates.
    pub match_window: chrono::Duration,
    /// Wall-clock budget of a single cycle.
    pub cycle_timeout: Duration,
    pub disable_status_server: bool,
    pub run_migrations: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RECON_HOST.to_string(),
            port: DEFAULT_RECON_PORT,
            database_url: Secret::new(DEFAULT_DATABASE_URL.to_string()),
            target_account: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            match_window: chrono::Duration::hours(DEFAULT_MATCH_WINDOW_HOURS),
            cycle_timeout: Duration::from_secs(DEFAULT_CYCLE_TIMEOUT_SECS),
            disable_status_server: false,
            run_migrations: true,
        }
    }
}

impl LinkerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. `from_env_or_default` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let host = lookup("RECON_HOST").unwrap_or_else(|| DEFAULT_RECON_HOST.into());
        let port = parse_or_default(&lookup, "RECON_PORT", DEFAULT_RECON_PORT);
        let database_url = lookup("RECON_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ RECON_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let target_account = lookup("RECON_TARGET_ACCOUNT").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        if target_account.is_none() {
            error!(
                "🪛️ RECON_TARGET_ACCOUNT is not set. The linker will start, but every cycle will be skipped until it \
                 is configured."
            );
        }
        let poll_secs = parse_positive_or_default(&lookup, "RECON_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS);
        let window_hours = parse_positive_or_default(&lookup, "RECON_MATCH_WINDOW_HOURS", DEFAULT_MATCH_WINDOW_HOURS);
        let timeout_secs = parse_positive_or_default(&lookup, "RECON_CYCLE_TIMEOUT_SECS", DEFAULT_CYCLE_TIMEOUT_SECS);
        let disable_status_server = parse_boolean_flag(lookup("RECON_DISABLE_STATUS_SERVER"), false);
        let run_migrations = parse_boolean_flag(lookup("RECON_RUN_MIGRATIONS"), true);
        Self {
            host,
            port,
            database_url: Secret::new(database_url),
            target_account,
            poll_interval: Duration::from_secs(poll_secs),
            match_window: chrono::Duration::hours(window_hours),
            cycle_timeout: Duration::from_secs(timeout_secs),
            disable_status_server,
            run_migrations,
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings { target_account: self.target_account.clone(), window: self.match_window }
    }
}

fn parse_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(name) {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("{}", invalid_value_message(&s, name, e, &default));
            default
        }),
    }
}

fn invalid_value_message<E: Display, T: Display>(value: &str, name: &str, error: E, default: &T) -> String {
    format!("🪛️ {value} is not a valid value for {name}. {error}. Using the default, {default}, instead.")
}

fn parse_positive_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + PartialOrd + Default + Copy,
    T::Err: Display,
{
    let value = parse_or_default(lookup, name, default);
    if value <= T::default() {
        error!("🪛️ {name} must be greater than zero. Using the default, {default}, instead.");
        return default;
    }
    value
}
