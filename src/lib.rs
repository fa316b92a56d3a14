//! # SKU Harvest
//!
//! A part-number extraction and classification pipeline for catalog documents.
//!
//! SKU Harvest scans bulk documents (PDF catalogs, plain-text dumps) for
//! part-number-like codes, merges them into a shared SQLite store as
//! source-tracked `RAW` records, and then enriches each record with
//! brand/application/category metadata by batching pending records through an
//! external LLM classifier.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │  Documents  │──▶│   Miner    │──▶│  SQLite    │◀──│ Classifier │
//! │  PDF / TXT  │   │ extract +  │   │ records    │   │  worker    │
//! └─────────────┘   │ merge      │   │ status=RAW │   │ (polling)  │
//!                   └────────────┘   └────────────┘   └─────┬──────┘
//!                                                           │
//!                                                     ┌─────▼──────┐
//!                                                     │  Groq API  │
//!                                                     └────────────┘
//! ```
//!
//! The store doubles as the work queue: the classification worker polls for
//! `RAW` records in bounded batches, submits one request per batch, and writes
//! idempotent merges back. All store mutations are commutative merges, so
//! independent mining and classification processes can run concurrently
//! against the same database without coordination.
//!
//! ## Quick Start
//!
//! ```bash
//! skuh init                       # create database
//! skuh mine ./catalogs            # extract codes from a corpus
//! skuh classify --drain           # classify until the queue is empty
//! skuh status                     # store overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and lifecycle states |
//! | [`extract`] | Code extraction and document text readers |
//! | [`registry`] | Idempotent merge operations on the shared store |
//! | [`mine`] | Corpus mining orchestration |
//! | [`classifier`] | LLM classifier client |
//! | [`worker`] | Classification polling loop |
//! | [`stats`] | Store status overview |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod classifier;
pub mod config;
pub mod db;
pub mod extract;
pub mod migrate;
pub mod mine;
pub mod models;
pub mod registry;
pub mod stats;
pub mod worker;
