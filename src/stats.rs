//! Store status overview.
//!
//! Quick summary of what's in the store: record counts per lifecycle status,
//! top sources, and a missing-brand diagnostic. The authoritative pending
//! predicate everywhere else is `status = RAW`; the missing-brand count is
//! surfaced here only so an operator can spot records whose status advanced
//! ahead of their classification fields.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::models::Status;

struct SourceStats {
    source: String,
    record_count: i64,
}

/// Run the status command: query the store and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(&pool)
        .await?;

    let mut status_counts = Vec::new();
    for status in [Status::Raw, Status::Classified, Status::Processed] {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&pool)
            .await?;
        status_counts.push((status, count));
    }

    let missing_brand: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE status != 'RAW' AND brand IS NULL")
            .fetch_one(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("SKU Harvest — Store Status");
    println!("==========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Records:     {}", total_records);
    for (status, count) in &status_counts {
        println!("    {:<12} {}", format!("{}:", status), count);
    }
    println!();
    println!("  Advanced without brand (diagnostic): {}", missing_brand);

    // Top sources by record count
    let source_rows = sqlx::query(
        r#"
        SELECT source, COUNT(*) AS record_count
        FROM record_sources
        GROUP BY source
        ORDER BY record_count DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let sources: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            record_count: row.get("record_count"),
        })
        .collect();

    if !sources.is_empty() {
        println!();
        println!("  Top sources:");
        println!("  {:<40} {:>8}", "SOURCE", "RECORDS");
        println!("  {}", "-".repeat(50));
        for s in &sources {
            println!("  {:<40} {:>8}", s.source, s.record_count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_sensible_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
