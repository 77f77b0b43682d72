//! Analytics snapshot persistence.

use rusqlite::types::Value;

use super::store::{row_text, Order, Store, StoreError};
use crate::models::AnalyticsSnapshot;

/// Append-only snapshot history; the newest row per scraper is the
/// canonical read.
#[derive(Clone)]
pub struct AnalyticsRepository {
    store: Store,
}

impl AnalyticsRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Append one snapshot. History is never rewritten.
    pub fn append(&self, snapshot: &AnalyticsSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        self.store.insert(
            "analytics",
            &[
                ("scraper", Value::Text(snapshot.scraper.clone())),
                ("snapshot_json", Value::Text(json)),
                ("created_at", Value::Text(snapshot.created_at.to_rfc3339())),
            ],
        )?;
        Ok(())
    }

    /// Most recent snapshot for a scraper.
    pub fn latest(&self, scraper: &str) -> Result<Option<AnalyticsSnapshot>, StoreError> {
        let rows = self.store.search(
            "analytics",
            &[("scraper", Value::Text(scraper.to_string()))],
            &[("created_at", Order::Desc), ("id", Order::Desc)],
            Some(1),
        )?;
        Ok(rows
            .first()
            .and_then(|row| serde_json::from_str(&row_text(row, "snapshot_json")).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhaseStats;
    use chrono::Utc;

    fn snapshot(scraper: &str, success: &[&str]) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            scraper: scraper.to_string(),
            scraped: PhaseStats::new(
                success.iter().map(|s| s.to_string()).collect(),
                Vec::new(),
            ),
            content_retrieved: PhaseStats::default(),
            uploaded: PhaseStats::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_latest_returns_newest_snapshot() {
        let repo = AnalyticsRepository::new(Store::open_in_memory().unwrap());
        repo.append(&snapshot("acme", &["a"])).unwrap();
        repo.append(&snapshot("acme", &["a", "b"])).unwrap();

        let latest = repo.latest("acme").unwrap().unwrap();
        assert_eq!(latest.scraped.success_count, 2);
    }

    #[test]
    fn test_latest_missing_scraper() {
        let repo = AnalyticsRepository::new(Store::open_in_memory().unwrap());
        assert!(repo.latest("nobody").unwrap().is_none());
    }
}
