//! Resource record persistence with per-scraper dedup lookup.

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};

use super::parse_datetime;
use super::store::{row_bool, row_i64, row_text, row_text_opt, Row, Store, StoreError};
use crate::models::ResourceRecord;

/// Metadata store for ingested resources.
///
/// Content bytes never pass through here; rows carry only the content hash,
/// destination key, and bookkeeping flags.
#[derive(Clone)]
pub struct ResourceRepository {
    store: Store,
}

impl ResourceRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Persist an ingestion attempt, resolving the destination key against
    /// earlier records with the same `(scraper, content_hash)`.
    ///
    /// Lookup and insert run in one transaction so concurrent ingestion of
    /// identical content cannot race into two destination keys.
    pub fn record_attempt(&self, record: &mut ResourceRecord) -> Result<(), StoreError> {
        let scraper = record.scraper.clone();
        let hash = record.content_hash.clone();
        let mut dest_key = record.dest_key.clone();
        let mut id = 0i64;
        self.store.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            if let Some(hash) = &hash {
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT dest_key FROM resources \
                         WHERE scraper = ?1 AND content_hash = ?2 \
                         ORDER BY id LIMIT 1",
                        params![scraper, hash],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(key) = existing {
                    // Identical content already known under this scraper:
                    // discard the candidate key and reuse the original.
                    dest_key = key;
                }
            }
            tx.execute(
                "INSERT INTO resources \
                 (scraper, dest_key, source_url, content_hash, content_retrieved, uploaded, error, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    scraper,
                    dest_key,
                    record.source_url,
                    hash,
                    record.content_retrieved as i64,
                    record.uploaded as i64,
                    record.error,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            id = tx.last_insert_rowid();
            tx.commit()
        })?;
        record.dest_key = dest_key;
        record.id = id;
        Ok(())
    }

    /// Mark every record sharing the content key as uploaded, refreshing the
    /// timestamp. Insert-or-update keyed by `(content_hash, scraper)`: the
    /// row already exists from `record_attempt`, so only mutable fields move.
    pub fn mark_uploaded(&self, scraper: &str, content_hash: &str) -> Result<usize, StoreError> {
        self.store.update(
            "resources",
            &[
                ("uploaded", Value::Integer(1)),
                ("created_at", Value::Text(Utc::now().to_rfc3339())),
            ],
            &[
                ("scraper", Value::Text(scraper.to_string())),
                ("content_hash", Value::Text(content_hash.to_string())),
            ],
        )
    }

    /// All records for a scraper.
    pub fn for_scraper(&self, scraper: &str) -> Result<Vec<ResourceRecord>, StoreError> {
        let rows = self.store.search(
            "resources",
            &[("scraper", Value::Text(scraper.to_string()))],
            &[],
            None,
        )?;
        Ok(rows.iter().map(from_row).collect())
    }

    /// Whether any record for the URL under this scraper retrieved content.
    pub fn is_retrieved(&self, scraper: &str, source_url: &str) -> Result<bool, StoreError> {
        let rows = self.store.search(
            "resources",
            &[
                ("scraper", Value::Text(scraper.to_string())),
                ("source_url", Value::Text(source_url.to_string())),
                ("content_retrieved", Value::Integer(1)),
            ],
            &[],
            Some(1),
        )?;
        Ok(!rows.is_empty())
    }

    /// Whether any record for the URL under this scraper was uploaded.
    pub fn is_uploaded(&self, scraper: &str, source_url: &str) -> Result<bool, StoreError> {
        let rows = self.store.search(
            "resources",
            &[
                ("scraper", Value::Text(scraper.to_string())),
                ("source_url", Value::Text(source_url.to_string())),
                ("uploaded", Value::Integer(1)),
            ],
            &[],
            Some(1),
        )?;
        Ok(!rows.is_empty())
    }
}

fn from_row(row: &Row) -> ResourceRecord {
    ResourceRecord {
        id: row_i64(row, "id"),
        scraper: row_text(row, "scraper"),
        dest_key: row_text(row, "dest_key"),
        source_url: row_text(row, "source_url"),
        content_hash: row_text_opt(row, "content_hash"),
        bytes: None,
        content_retrieved: row_bool(row, "content_retrieved"),
        uploaded: row_bool(row, "uploaded"),
        error: row_text_opt(row, "error"),
        created_at: parse_datetime(&row_text(row, "created_at")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ResourceRepository {
        ResourceRepository::new(Store::open_in_memory().unwrap())
    }

    #[test]
    fn test_dedup_reuses_destination_key() {
        let repo = repo();
        let mut first =
            ResourceRecord::retrieved("acme", "lib/one.pdf".to_string(), "u1", b"same".to_vec());
        repo.record_attempt(&mut first).unwrap();

        let mut second =
            ResourceRecord::retrieved("acme", "lib/two.pdf".to_string(), "u2", b"same".to_vec());
        repo.record_attempt(&mut second).unwrap();

        // Candidate key discarded, existing identity reused.
        assert_eq!(second.dest_key, "lib/one.pdf");
        let rows = repo.for_scraper("acme").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].dest_key, rows[1].dest_key);
        assert_eq!(rows[0].content_hash, rows[1].content_hash);
        assert_ne!(rows[0].source_url, rows[1].source_url);
    }

    #[test]
    fn test_dedup_scoped_per_scraper() {
        let repo = repo();
        let mut first =
            ResourceRecord::retrieved("acme", "lib/one.pdf".to_string(), "u1", b"same".to_vec());
        repo.record_attempt(&mut first).unwrap();

        let mut other =
            ResourceRecord::retrieved("rival", "lib/two.pdf".to_string(), "u1", b"same".to_vec());
        repo.record_attempt(&mut other).unwrap();

        // Identical content under a different scraper keeps its own key.
        assert_eq!(other.dest_key, "lib/two.pdf");
    }

    #[test]
    fn test_failed_attempts_do_not_dedup() {
        let repo = repo();
        let mut failed =
            ResourceRecord::failed("acme", "lib/one.pdf".to_string(), "u1", "timeout".to_string());
        repo.record_attempt(&mut failed).unwrap();
        let mut again =
            ResourceRecord::failed("acme", "lib/two.pdf".to_string(), "u1", "timeout".to_string());
        repo.record_attempt(&mut again).unwrap();
        assert_eq!(again.dest_key, "lib/two.pdf");
        assert!(!repo.is_retrieved("acme", "u1").unwrap());
    }

    #[test]
    fn test_mark_uploaded_updates_all_rows_for_key() {
        let repo = repo();
        let mut first =
            ResourceRecord::retrieved("acme", "lib/one.pdf".to_string(), "u1", b"same".to_vec());
        repo.record_attempt(&mut first).unwrap();
        let mut second =
            ResourceRecord::retrieved("acme", "lib/two.pdf".to_string(), "u2", b"same".to_vec());
        repo.record_attempt(&mut second).unwrap();

        let hash = first.content_hash.clone().unwrap();
        let changed = repo.mark_uploaded("acme", &hash).unwrap();
        assert_eq!(changed, 2);
        assert!(repo.is_uploaded("acme", "u1").unwrap());
        assert!(repo.is_uploaded("acme", "u2").unwrap());
    }
}
