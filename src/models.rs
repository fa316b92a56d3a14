//! Core data models used throughout SKU Harvest.
//!
//! These types represent the candidate records that flow through the mining
//! and classification pipeline, and the lifecycle states that drive the
//! classification work queue.

use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a candidate record with respect to the classification
/// stage. Transitions only move forward: `Raw < Classified < Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    /// Mined but not yet classified; member of the work queue.
    Raw,
    /// Enriched with brand/category metadata by the classifier.
    Classified,
    /// Fully consumed by downstream stages (SKU generation etc.).
    Processed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Raw => "RAW",
            Status::Classified => "CLASSIFIED",
            Status::Processed => "PROCESSED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RAW" => Ok(Status::Raw),
            "CLASSIFIED" => Ok(Status::Classified),
            "PROCESSED" => Ok(Status::Processed),
            other => Err(format!("unknown record status: '{}'", other)),
        }
    }
}

/// One record per unique mined code. The `code` is the canonical identifier
/// and the store's unique key; source names live in a companion table and are
/// loaded separately (see [`crate::registry::sources_for`]).
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub code: String,
    pub status: Status,
    pub brand: Option<String>,
    pub application: Option<String>,
    pub category: Option<String>,
    pub agent: Option<String>,
    pub processed_at: Option<i64>,
    pub first_seen: i64,
}

/// A single classification result for one requested code, as parsed out of
/// the classifier's structured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The requested code this entry answers for.
    pub input: String,
    pub brand: String,
    /// The classifier's `type` field (oil, fuel, air, ...).
    pub category: String,
    pub application: Option<String>,
}
