//! # SKU Harvest CLI (`skuh`)
//!
//! The `skuh` binary drives the extraction-and-classification pipeline:
//! database initialization, corpus mining, the classification worker, and a
//! store status overview.
//!
//! ## Usage
//!
//! ```bash
//! skuh --config ./config/skuh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skuh init` | Create the SQLite database and run schema migrations |
//! | `skuh mine <path>` | Extract candidate codes from a corpus or single file |
//! | `skuh classify` | Run the classification worker against pending records |
//! | `skuh status` | Print record counts and source breakdowns |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! skuh init --config ./config/skuh.toml
//!
//! # Mine every catalog in a directory (excluded globs skipped)
//! skuh mine ./catalogs
//!
//! # Mine the oversized interchange manual explicitly, page by page
//! skuh mine ./catalogs/04_Master_Interchange.pdf --stream
//!
//! # Classify until the queue is empty, then exit
//! skuh classify --drain
//!
//! # Run the classifier as a long-lived service
//! skuh classify
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sku_harvest::{config, migrate, mine, stats, worker};

/// SKU Harvest CLI — a part-number extraction and classification pipeline
/// for catalog documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/skuh.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "skuh",
    about = "SKU Harvest — part-number extraction and classification pipeline",
    version,
    long_about = "SKU Harvest mines part-number codes out of bulk catalog documents \
    (PDF and plain text) into a shared SQLite store, then enriches the pending records \
    with brand/application/category metadata through an LLM classifier, using the store \
    itself as an at-least-once work queue."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/skuh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the record tables. Idempotent —
    /// running it multiple times is safe.
    Init,

    /// Extract candidate codes from a document corpus.
    ///
    /// Scans a directory (or a single file) for PDF and plain-text
    /// documents, extracts part-number candidates, and merges them into the
    /// store as RAW records. Re-mining the same corpus never duplicates
    /// records or source entries.
    Mine {
        /// Corpus directory or a single document file. Naming a file
        /// directly bypasses the configured exclude globs.
        path: PathBuf,

        /// Force page-by-page extraction regardless of file size.
        #[arg(long)]
        stream: bool,

        /// Ignore the configured exclude globs for this directory run.
        #[arg(long)]
        all: bool,
    },

    /// Run the classification worker.
    ///
    /// Polls RAW records in bounded batches, submits each batch to the
    /// configured classifier, and merges results back. Requires the
    /// GROQ_API_KEY environment variable.
    Classify {
        /// Exit once the queue is empty instead of idling for more work.
        #[arg(long)]
        drain: bool,
    },

    /// Print a store overview.
    ///
    /// Record counts per lifecycle status, diagnostic counters, and the top
    /// sources by record count.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Mine { path, stream, all } => {
            mine::run_mine(&cfg, &path, stream, all).await?;
        }
        Commands::Classify { drain } => {
            worker::run_classify(&cfg, drain).await?;
        }
        Commands::Status => {
            stats::run_status(&cfg).await?;
        }
    }

    Ok(())
}
