//! Persisted run output: one serialized result tree per scraper.

use chrono::Utc;
use rusqlite::params;
use rusqlite::types::Value;

use super::store::{row_text, Store, StoreError};
use crate::models::ResultTree;

/// One row per scraper holding the full nested result as JSON text,
/// overwritten on each run.
#[derive(Clone)]
pub struct OutputRepository {
    store: Store,
}

impl OutputRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Overwrite the output row for a scraper.
    pub fn save(&self, scraper: &str, tree: &ResultTree) -> Result<(), StoreError> {
        let json = serde_json::to_string(tree)?;
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO outputs (scraper, result_json, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(scraper) DO UPDATE SET \
                 result_json = excluded.result_json, updated_at = excluded.updated_at",
                params![scraper, json, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Load the persisted tree for a scraper, if any.
    pub fn load(&self, scraper: &str) -> Result<Option<ResultTree>, StoreError> {
        let rows = self.store.search(
            "outputs",
            &[("scraper", Value::Text(scraper.to_string()))],
            &[],
            Some(1),
        )?;
        Ok(rows
            .first()
            .and_then(|row| serde_json::from_str(&row_text(row, "result_json")).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScrapeOutput;

    #[test]
    fn test_save_overwrites_single_row() {
        let repo = OutputRepository::new(Store::open_in_memory().unwrap());
        let mut tree = ResultTree::new();
        tree.insert("jot".to_string(), ScrapeOutput::Links(vec!["a.pdf".to_string()]));
        repo.save("acme", &tree).unwrap();

        tree.insert("jot".to_string(), ScrapeOutput::Links(vec!["b.pdf".to_string()]));
        repo.save("acme", &tree).unwrap();

        let loaded = repo.load("acme").unwrap().unwrap();
        assert_eq!(loaded.get("jot").unwrap().links(), vec!["b.pdf"]);
    }

    #[test]
    fn test_load_missing_scraper() {
        let repo = OutputRepository::new(Store::open_in_memory().unwrap());
        assert!(repo.load("nobody").unwrap().is_none());
    }
}
