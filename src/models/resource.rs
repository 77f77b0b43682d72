//! Resource records for content-addressed ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One ingestion attempt for a harvested link.
///
/// Content bytes are attached transiently for the upload step and are never
/// persisted to the relational store; only the object store holds them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Database row ID (0 before insert).
    pub id: i64,
    /// Scraper namespace. Dedup never crosses this boundary.
    pub scraper: String,
    /// Object store destination key. Reused from an earlier record when the
    /// content hash already exists under this scraper.
    pub dest_key: String,
    /// URL the bytes were retrieved from.
    pub source_url: String,
    /// SHA-256 digest of the content, hex encoded. None when retrieval failed.
    pub content_hash: Option<String>,
    /// Retrieved bytes, in-memory only.
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    /// Whether content retrieval succeeded.
    pub content_retrieved: bool,
    /// Whether the bytes were written to the object store.
    pub uploaded: bool,
    /// Error message when retrieval failed.
    pub error: Option<String>,
    /// When the ingestion attempt happened.
    pub created_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Compute the hex-encoded SHA-256 content address of a byte buffer.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Create a record for a successful retrieval.
    pub fn retrieved(scraper: &str, dest_key: String, source_url: &str, bytes: Vec<u8>) -> Self {
        let content_hash = Self::compute_hash(&bytes);
        Self {
            id: 0,
            scraper: scraper.to_string(),
            dest_key,
            source_url: source_url.to_string(),
            content_hash: Some(content_hash),
            bytes: Some(bytes),
            content_retrieved: true,
            uploaded: false,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Create a record for a failed retrieval. No hash, no finalized key.
    pub fn failed(scraper: &str, dest_key: String, source_url: &str, error: String) -> Self {
        Self {
            id: 0,
            scraper: scraper.to_string(),
            dest_key,
            source_url: source_url.to_string(),
            content_hash: None,
            bytes: None,
            content_retrieved: false,
            uploaded: false,
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}
