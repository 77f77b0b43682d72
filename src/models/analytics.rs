//! Analytics snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paired success/failure statistics for one pipeline phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub success: Vec<String>,
    pub failure: Vec<String>,
    pub success_count: usize,
    pub failure_count: usize,
    /// `success / (success + failure)`, `0.0` when both are empty.
    pub ratio: f64,
}

impl PhaseStats {
    /// Build phase statistics from success and failure link lists.
    pub fn new(success: Vec<String>, failure: Vec<String>) -> Self {
        let success_count = success.len();
        let failure_count = failure.len();
        let total = success_count + failure_count;
        let ratio = if total == 0 {
            0.0
        } else {
            success_count as f64 / total as f64
        };
        Self {
            success,
            failure,
            success_count,
            failure_count,
            ratio,
        }
    }
}

/// Per-scraper success/failure summary across the three pipeline phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub scraper: String,
    /// Links harvested into the output record vs. links in the failure ledger.
    pub scraped: PhaseStats,
    /// Of the scraped links, which had their content retrieved.
    pub content_retrieved: PhaseStats,
    /// Of the retrieved links, which were persisted to the object store.
    pub uploaded: PhaseStats,
    pub created_at: DateTime<Utc>,
}
