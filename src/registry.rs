//! Idempotent merge operations on the shared record store.
//!
//! Every mutation here is a commutative, retry-safe merge: set-union for
//! sources, overwrite-if-absent for classification fields, and a forward-only
//! guard on `status`. That lets independent mining and classification
//! processes write concurrently against the same database with no
//! application-level locking — re-issuing any call after a crash is always
//! safe.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{CandidateRecord, Classification, Status};

/// Outcome of a batch merge: how many items went through, and how many of
/// those were codes the store had never seen before.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: u64,
    pub new: u64,
}

/// Upsert a record keyed by `code` and add `source` to its source set.
///
/// New records start as `RAW`; existing records keep their status and
/// classification fields untouched. Adding a source the record already has is
/// a no-op, so re-mining the same document never duplicates anything.
///
/// The record upsert and the source insert commit as one transaction: a
/// merge either lands whole or not at all, so a kill mid-call can never
/// leave a code visible without its source.
///
/// Returns `true` if the code was newly observed.
pub async fn merge_source(pool: &SqlitePool, code: &str, source: &str) -> Result<bool> {
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO records (code, status, first_seen) VALUES (?, 'RAW', ?)
        ON CONFLICT(code) DO NOTHING
        "#,
    )
    .bind(code)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO record_sources (code, source) VALUES (?, ?)")
        .bind(code)
        .bind(source)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(inserted.rows_affected() > 0)
}

/// Merge a batch of codes from one document, unordered: an item that fails to
/// write is logged and does not abort its siblings.
pub async fn merge_source_batch(pool: &SqlitePool, codes: &[String], source: &str) -> MergeReport {
    let mut report = MergeReport::default();
    for code in codes {
        match merge_source(pool, code, source).await {
            Ok(newly_seen) => {
                report.merged += 1;
                if newly_seen {
                    report.new += 1;
                }
            }
            Err(e) => eprintln!("Warning: could not merge code '{}': {}", code, e),
        }
    }
    report
}

/// Write a classification result for `code`, advancing `status` forward-only.
///
/// Classification fields are overwrite-if-absent: a field already populated
/// by an earlier write wins, so repeating the call (or racing another worker)
/// cannot clobber data. `sources` are never touched. A record that was never
/// mined is still upserted, keyed by its code.
pub async fn merge_classification(
    pool: &SqlitePool,
    result: &Classification,
    agent: &str,
    to: Status,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO records (code, status, brand, application, category, agent, processed_at, first_seen)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET
            brand = COALESCE(records.brand, excluded.brand),
            application = COALESCE(records.application, excluded.application),
            category = COALESCE(records.category, excluded.category),
            agent = COALESCE(records.agent, excluded.agent),
            processed_at = COALESCE(records.processed_at, excluded.processed_at),
            status = CASE
                WHEN records.status = 'RAW' THEN excluded.status
                WHEN records.status = 'CLASSIFIED' AND excluded.status = 'PROCESSED' THEN excluded.status
                ELSE records.status
            END
        "#,
    )
    .bind(&result.input)
    .bind(to.as_str())
    .bind(&result.brand)
    .bind(&result.application)
    .bind(&result.category)
    .bind(agent)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch up to `limit` records in the given status. No ordering contract
/// beyond "repeated polls eventually see every matching record once earlier
/// ones advance out of the status".
pub async fn find_by_status(
    pool: &SqlitePool,
    status: Status,
    limit: usize,
) -> Result<Vec<CandidateRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT code, status, brand, application, category, agent, processed_at, first_seen
        FROM records
        WHERE status = ?
        LIMIT ?
        "#,
    )
    .bind(status.as_str())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(row_to_record(row)?);
    }
    Ok(records)
}

/// Sorted source set for one record.
pub async fn sources_for(pool: &SqlitePool, code: &str) -> Result<Vec<String>> {
    let sources: Vec<String> =
        sqlx::query_scalar("SELECT source FROM record_sources WHERE code = ? ORDER BY source")
            .bind(code)
            .fetch_all(pool)
            .await?;
    Ok(sources)
}

/// Fetch a single record by code.
pub async fn get_record(pool: &SqlitePool, code: &str) -> Result<Option<CandidateRecord>> {
    let row = sqlx::query(
        r#"
        SELECT code, status, brand, application, category, agent, processed_at, first_seen
        FROM records
        WHERE code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_record).transpose()
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<CandidateRecord> {
    let status_str: String = row.get("status");
    let status: Status = status_str
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    Ok(CandidateRecord {
        code: row.get("code"),
        status,
        brand: row.get("brand"),
        application: row.get("application"),
        category: row.get("category"),
        agent: row.get("agent"),
        processed_at: row.get("processed_at"),
        first_seen: row.get("first_seen"),
    })
}
