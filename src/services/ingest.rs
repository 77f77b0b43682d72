//! Content-addressed ingestion and upload.
//!
//! Ingestion fetches bytes, computes their SHA-256 address, and resolves
//! the destination key against earlier records so identical content under
//! one scraper is never stored twice. Upload writes bytes to the object
//! store and flips the metadata flags.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::fetch::{FetchOptions, Fetcher};
use crate::models::ResourceRecord;
use crate::repository::{FailureLedger, ResourceRepository};
use crate::storage::{extension_for_url, ObjectStore};

/// Counters for one upload pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Links submitted for ingestion.
    pub attempted: usize,
    /// Links whose content was retrieved.
    pub retrieved: usize,
    /// Links persisted to the object store.
    pub uploaded: usize,
    /// Links that failed retrieval or upload.
    pub failed: usize,
}

impl UploadStats {
    pub fn merge(&mut self, other: UploadStats) {
        self.attempted += other.attempted;
        self.retrieved += other.retrieved;
        self.uploaded += other.uploaded;
        self.failed += other.failed;
    }
}

/// Dedup-aware resource store over the object store and metadata rows.
#[derive(Clone)]
pub struct ResourceStore {
    resources: ResourceRepository,
    objects: Arc<dyn ObjectStore>,
}

impl ResourceStore {
    pub fn new(resources: ResourceRepository, objects: Arc<dyn ObjectStore>) -> Self {
        Self { resources, objects }
    }

    /// Ingest one source URL.
    ///
    /// Generates a fresh candidate key `{root_key}/{uuid}.{ext}`, retrieves
    /// the bytes, and content-addresses them. When the hash already exists
    /// under this scraper the candidate key is discarded in favor of the
    /// existing record's key. Retrieval failure is not retried; it surfaces
    /// as `content_retrieved = false` for the caller to log.
    pub async fn ingest(
        &self,
        scraper: &str,
        root_key: &str,
        source_url: &str,
        fetcher: &dyn Fetcher,
        options: &FetchOptions,
    ) -> ResourceRecord {
        let candidate = format!(
            "{}/{}.{}",
            root_key,
            Uuid::new_v4(),
            extension_for_url(source_url)
        );

        let mut record = match fetcher.fetch(source_url, options).await {
            Ok(bytes) => ResourceRecord::retrieved(scraper, candidate, source_url, bytes),
            Err(e) => {
                debug!("{}: retrieval failed for {}: {}", scraper, source_url, e);
                ResourceRecord::failed(scraper, candidate, source_url, e.to_string())
            }
        };

        if let Err(e) = self.resources.record_attempt(&mut record) {
            warn!("{}: failed to persist resource record: {}", scraper, e);
        }
        record
    }

    /// Write a record's bytes to the object store and update its metadata.
    ///
    /// Returns false when there is nothing to upload or a store write
    /// failed; storage problems never panic or abort the caller.
    pub fn upload(&self, record: &mut ResourceRecord) -> bool {
        let (bytes, hash) = match (&record.bytes, &record.content_hash) {
            (Some(bytes), Some(hash)) => (bytes, hash),
            _ => return false,
        };

        if let Err(e) = self.objects.put(&record.dest_key, bytes) {
            warn!(
                "{}: object store write failed for {}: {}",
                record.scraper, record.dest_key, e
            );
            return false;
        }

        match self.resources.mark_uploaded(&record.scraper, hash) {
            Ok(_) => {
                record.uploaded = true;
                true
            }
            Err(e) => {
                warn!(
                    "{}: failed to mark {} uploaded: {}",
                    record.scraper, record.dest_key, e
                );
                false
            }
        }
    }

    /// Ingest and upload a batch of harvested links.
    ///
    /// Retrieval failures go to the failure ledger under the link URL.
    pub async fn ingest_and_upload(
        &self,
        scraper: &str,
        root_key: &str,
        links: &[&str],
        fetcher: &dyn Fetcher,
        options: &FetchOptions,
        ledger: &FailureLedger,
    ) -> UploadStats {
        let mut stats = UploadStats::default();
        for link in links {
            stats.attempted += 1;
            let mut record = self.ingest(scraper, root_key, link, fetcher, options).await;
            if !record.content_retrieved {
                stats.failed += 1;
                let message = record.error.as_deref().unwrap_or("retrieval failed");
                if let Err(e) = ledger.record(scraper, link, message) {
                    warn!("Failed to record failure for {}: {}", link, e);
                }
                continue;
            }
            stats.retrieved += 1;
            if self.upload(&mut record) {
                stats.uploaded += 1;
            } else {
                stats.failed += 1;
            }
        }
        stats
    }
}
