//! Corpus mining orchestration.
//!
//! Walks a document corpus (a directory of catalogs, or a single file named
//! explicitly), extracts candidate codes per document, and merges them into
//! the store in bounded batches. One broken document never aborts the scan:
//! it is logged on stderr and the walk continues.
//!
//! Chunking granularity is a tunable, not two code paths: small documents
//! are mined in one extraction pass with bounded batch writes, documents
//! over `mining.stream_threshold_bytes` (or with `--stream`) go page-by-page
//! so each page's codes are already persisted before a later page can fail.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, MiningConfig};
use crate::db;
use crate::extract;
use crate::registry::{self, MergeReport};

pub async fn run_mine(config: &Config, path: &Path, stream: bool, all: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let documents = discover_documents(path, &config.mining, all)?;

    println!("mine {}", path.display());

    let mut scanned = 0u64;
    let mut skipped = 0u64;
    let mut totals = MergeReport::default();

    for doc in &documents {
        match mine_document(&pool, &config.mining, doc, stream).await {
            Ok(report) => {
                scanned += 1;
                totals.merged += report.merged;
                totals.new += report.new;
                println!(
                    "  {}: {} codes ({} new)",
                    document_name(doc),
                    report.merged,
                    report.new
                );
            }
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", doc.display(), e);
                skipped += 1;
            }
        }
    }

    println!("  documents scanned: {}", scanned);
    println!("  documents skipped: {}", skipped);
    println!("  codes merged: {}", totals.merged);
    println!("  codes new: {}", totals.new);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Enumerate the documents to mine. A single-file path is taken as-is — the
/// operator named it explicitly, so exclude globs do not apply (that is how
/// an oversized manual excluded from default runs still gets mined). For a
/// directory, unsupported extensions are silently skipped and the result is
/// sorted for deterministic ordering.
pub fn discover_documents(path: &Path, config: &MiningConfig, all: bool) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("Mining path does not exist: {}", path.display());
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let exclude_set = if all {
        None
    } else {
        Some(build_globset(&config.exclude_globs)?)
    };

    let mut documents = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Same policy as a broken document: log and keep walking.
                eprintln!("Warning: skipping unreadable corpus entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let doc_path = entry.path();
        if !extract::is_supported(doc_path) {
            continue;
        }

        let relative = doc_path.strip_prefix(path).unwrap_or(doc_path);
        if let Some(ref excludes) = exclude_set {
            if excludes.is_match(relative) {
                continue;
            }
        }

        documents.push(doc_path.to_path_buf());
    }

    documents.sort();
    Ok(documents)
}

/// Mine one document: extract candidate codes and merge them as `RAW`
/// records sourced to this document's file name.
pub async fn mine_document(
    pool: &SqlitePool,
    config: &MiningConfig,
    path: &Path,
    force_stream: bool,
) -> Result<MergeReport> {
    let source = document_name(path);
    let size = std::fs::metadata(path)?.len();

    if force_stream || size > config.stream_threshold_bytes {
        mine_paginated(pool, config, path, &source).await
    } else {
        mine_whole_document(pool, config, path, &source).await
    }
}

/// One extraction pass over the full text, then bounded batch writes.
async fn mine_whole_document(
    pool: &SqlitePool,
    config: &MiningConfig,
    path: &Path,
    source: &str,
) -> Result<MergeReport> {
    let text = extract::read_document(path)?;
    let mut codes: Vec<String> = extract::extract_codes(&text).into_iter().collect();
    codes.sort();

    let mut totals = MergeReport::default();
    for batch in codes.chunks(config.batch_size) {
        let report = registry::merge_source_batch(pool, batch, source).await;
        totals.merged += report.merged;
        totals.new += report.new;
    }
    Ok(totals)
}

/// Page-by-page extraction with an immediate write per page, so partial
/// progress survives a failure further into the document.
///
/// [`extract::document_pages`] materializes every page's text up front, so
/// this mode checkpoints persisted progress per page rather than bounding
/// peak memory.
async fn mine_paginated(
    pool: &SqlitePool,
    config: &MiningConfig,
    path: &Path,
    source: &str,
) -> Result<MergeReport> {
    let pages = extract::document_pages(path)?;
    let total_pages = pages.len();

    let mut totals = MergeReport::default();
    for (index, page) in pages.iter().enumerate() {
        let codes: Vec<String> = extract::extract_codes(page).into_iter().collect();
        if !codes.is_empty() {
            let report = registry::merge_source_batch(pool, &codes, source).await;
            totals.merged += report.merged;
            totals.new += report.new;
        }

        if config.page_log_interval > 0 && (index + 1) % config.page_log_interval == 0 {
            eprintln!("  {}: page {}/{}", source, index + 1, total_pages);
        }
    }
    Ok(totals)
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
