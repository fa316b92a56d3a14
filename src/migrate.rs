use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an open pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per unique mined code. Classification fields stay NULL until
    // the worker writes them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            code TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'RAW',
            brand TEXT,
            application TEXT,
            category TEXT,
            agent TEXT,
            processed_at INTEGER,
            first_seen INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Set-union source tracking: the composite key makes INSERT OR IGNORE a
    // true set-add, safe under concurrent uncoordinated writers.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS record_sources (
            code TEXT NOT NULL,
            source TEXT NOT NULL,
            PRIMARY KEY (code, source)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_status ON records(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_record_sources_source ON record_sources(source)")
        .execute(pool)
        .await?;

    Ok(())
}
