//! Failure records for the append-only failure ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded per-unit failure.
///
/// Multiple rows may exist for the same `(scraper, source)` pair over time;
/// reads resolve to the newest row, nothing is ever deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Database row ID (0 before insert).
    pub id: i64,
    /// Scraper that hit the failure.
    pub scraper: String,
    /// Failed unit, usually the issue or article URL.
    pub source: String,
    /// Error message at the time of failure.
    pub message: String,
    /// When the failure was recorded.
    pub created_at: DateTime<Utc>,
}

impl FailureRecord {
    /// Create a new failure record timestamped now.
    pub fn new(scraper: &str, source: &str, message: &str) -> Self {
        Self {
            id: 0,
            scraper: scraper.to_string(),
            source: source.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        }
    }
}
