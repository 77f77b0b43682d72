//! Pipeline analytics.
//!
//! A snapshot measures one scraper across the three pipeline phases:
//! links harvested into the output record, links whose content was
//! retrieved, and links persisted to the object store. Each later phase
//! draws its population from the previous phase's successes, so the
//! ratios compose into a funnel.

use chrono::Utc;
use tracing::warn;

use crate::models::{all_links, AnalyticsSnapshot, PhaseStats};
use crate::repository::{
    AnalyticsRepository, FailureLedger, OutputRepository, ResourceRepository, Store, StoreError,
};

/// Computes and persists per-scraper analytics snapshots.
#[derive(Clone)]
pub struct AnalyticsService {
    outputs: OutputRepository,
    resources: ResourceRepository,
    ledger: FailureLedger,
    snapshots: AnalyticsRepository,
}

impl AnalyticsService {
    pub fn new(store: Store) -> Self {
        Self {
            outputs: OutputRepository::new(store.clone()),
            resources: ResourceRepository::new(store.clone()),
            ledger: FailureLedger::new(store.clone()),
            snapshots: AnalyticsRepository::new(store),
        }
    }

    /// Compute a fresh snapshot for a scraper and append it to history.
    pub fn snapshot(&self, scraper: &str) -> Result<AnalyticsSnapshot, StoreError> {
        let harvested = match self.outputs.load(scraper)? {
            Some(tree) => all_links(&tree),
            None => Vec::new(),
        };
        let failed: Vec<String> = self
            .ledger
            .latest_failures(scraper)?
            .into_iter()
            .map(|f| f.source)
            .collect();
        let scraped = PhaseStats::new(harvested, failed);

        let mut retrieved = Vec::new();
        let mut not_retrieved = Vec::new();
        for link in &scraped.success {
            if self.resources.is_retrieved(scraper, link)? {
                retrieved.push(link.clone());
            } else {
                not_retrieved.push(link.clone());
            }
        }
        let content_retrieved = PhaseStats::new(retrieved, not_retrieved);

        let mut uploaded = Vec::new();
        let mut not_uploaded = Vec::new();
        for link in &content_retrieved.success {
            if self.resources.is_uploaded(scraper, link)? {
                uploaded.push(link.clone());
            } else {
                not_uploaded.push(link.clone());
            }
        }
        let uploaded = PhaseStats::new(uploaded, not_uploaded);

        let snapshot = AnalyticsSnapshot {
            scraper: scraper.to_string(),
            scraped,
            content_retrieved,
            uploaded,
            created_at: Utc::now(),
        };
        if let Err(e) = self.snapshots.append(&snapshot) {
            warn!("{}: failed to persist analytics snapshot: {}", scraper, e);
        }
        Ok(snapshot)
    }

    /// Most recently persisted snapshot, if any.
    pub fn latest(&self, scraper: &str) -> Result<Option<AnalyticsSnapshot>, StoreError> {
        self.snapshots.latest(scraper)
    }
}
