//! Append-only failure ledger.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::types::Value;

use super::store::{row_i64, row_text, Order, Row, Store, StoreError};
use super::parse_datetime;
use crate::models::FailureRecord;

/// Persisted, queryable record of per-unit scraping failures.
///
/// Rows are only ever appended; reads resolve each `(scraper, source)` pair
/// to the row with the newest timestamp.
#[derive(Clone)]
pub struct FailureLedger {
    store: Store,
}

impl FailureLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Append a failure row timestamped now.
    pub fn record(&self, scraper: &str, source: &str, message: &str) -> Result<(), StoreError> {
        self.store.insert(
            "failures",
            &[
                ("scraper", Value::Text(scraper.to_string())),
                ("source", Value::Text(source.to_string())),
                ("message", Value::Text(message.to_string())),
                ("created_at", Value::Text(Utc::now().to_rfc3339())),
            ],
        )?;
        Ok(())
    }

    /// All failure rows for a scraper, newest first.
    pub fn all(&self, scraper: &str) -> Result<Vec<FailureRecord>, StoreError> {
        let rows = self.store.search(
            "failures",
            &[("scraper", Value::Text(scraper.to_string()))],
            &[("created_at", Order::Desc), ("id", Order::Desc)],
            None,
        )?;
        Ok(rows.iter().map(from_row).collect())
    }

    /// Latest failure per distinct source under a scraper.
    ///
    /// Group-by-max semantics: for each source only the row with the maximum
    /// timestamp is returned, older rows stay in the table but are
    /// superseded for read purposes.
    pub fn latest_failures(&self, scraper: &str) -> Result<Vec<FailureRecord>, StoreError> {
        let mut latest: BTreeMap<String, FailureRecord> = BTreeMap::new();
        // Rows arrive newest first, so the first row per source wins.
        for record in self.all(scraper)? {
            latest.entry(record.source.clone()).or_insert(record);
        }
        Ok(latest.into_values().collect())
    }
}

fn from_row(row: &Row) -> FailureRecord {
    FailureRecord {
        id: row_i64(row, "id"),
        scraper: row_text(row, "scraper"),
        source: row_text(row, "source"),
        message: row_text(row, "message"),
        created_at: parse_datetime(&row_text(row, "created_at")),
    }
}
