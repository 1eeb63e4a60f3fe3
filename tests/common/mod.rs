#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tokenstore::{Dialect, ErrorSink, ManualClock, StoreError, StoreOptions, TokenStore};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Sink that keeps every report for later assertions.
#[derive(Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, err: &StoreError) {
        self.reports.lock().unwrap().push(err.to_string());
    }
}

/// A single-connection pool on a private in-memory SQLite database.
///
/// No idle or lifetime reaping, so the database lives as long as the pool.
pub async fn memory_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite")
}

/// A store on a private in-memory SQLite database.
pub async fn sqlite_store(clock: Arc<ManualClock>, options: StoreOptions) -> TokenStore {
    TokenStore::with_pool(memory_pool().await, Dialect::Sqlite, options.clock(clock))
        .await
        .expect("provision token table")
}
