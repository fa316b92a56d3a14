//! Database connection for the shared record store.
//!
//! WAL journal mode is what lets a mining run and a classification worker
//! write concurrently against the same database file; the busy timeout
//! covers the brief writer-lock contention between their merge statements
//! instead of surfacing it as an error. Each process holds a small pool —
//! every merge is a single short statement or transaction, so connections
//! are never held across classifier or extraction work.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // First run: the data directory may not exist yet.
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    Ok(pool)
}
