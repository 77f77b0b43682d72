//! Hierarchical traversal with early abandonment.
//!
//! The controller drives the volume/issue walk for one journal. Each issue
//! is fetched through an [`IssueSource`]; an issue that errors or yields no
//! links counts as a miss and goes to the failure ledger, and a run of
//! consecutive misses abandons the remaining issues of the current volume.
//! Sibling volumes are unaffected.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::{NumericRange, VolumeTree};
use crate::repository::FailureLedger;

/// Message recorded when a unit fetch succeeds but extraction finds nothing.
pub const NO_LINKS_MESSAGE: &str = "no links extracted";

/// Fetches and extracts one issue of a journal.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// URL of the issue page, used as the failure ledger key.
    fn issue_url(&self, volume: u32, issue: u32) -> String;

    /// Fetch the issue page and extract candidate document links.
    async fn fetch_issue(&self, volume: u32, issue: u32) -> anyhow::Result<Vec<String>>;
}

/// Drives the volume/issue walk for one journal.
pub struct TraversalController<'a> {
    scraper: &'a str,
    threshold: u32,
    ledger: &'a FailureLedger,
}

impl<'a> TraversalController<'a> {
    pub fn new(scraper: &'a str, threshold: u32, ledger: &'a FailureLedger) -> Self {
        // A zero threshold would abandon every volume before its first
        // issue; treat it as 1.
        let threshold = threshold.max(1);
        Self {
            scraper,
            threshold,
            ledger,
        }
    }

    /// Walk all volumes of a journal.
    ///
    /// Volumes yielding no issues at all are omitted from the tree and do
    /// not stop the walk; the next volume is always attempted.
    pub async fn walk_volumes(
        &self,
        volumes: NumericRange,
        issues: NumericRange,
        source: &dyn IssueSource,
    ) -> VolumeTree {
        let mut tree = VolumeTree::new();
        for volume in volumes.iter() {
            let issue_map = self.walk_issues(volume, issues, source).await;
            if !issue_map.is_empty() {
                tree.insert(volume, issue_map);
            }
        }
        tree
    }

    /// Walk the issues of one volume, stopping at the miss threshold.
    pub async fn walk_issues(
        &self,
        volume: u32,
        issues: NumericRange,
        source: &dyn IssueSource,
    ) -> BTreeMap<u32, Vec<String>> {
        let mut issue_map = BTreeMap::new();
        let mut misses = 0u32;

        for issue in issues.iter() {
            match self.fetch_unit(volume, issue, source).await {
                Some(links) => {
                    misses = 0;
                    issue_map.insert(issue, links);
                }
                None => {
                    misses += 1;
                    if misses >= self.threshold {
                        debug!(
                            "{}: volume {} abandoned after {} consecutive misses",
                            self.scraper, volume, misses
                        );
                        break;
                    }
                }
            }
        }

        issue_map
    }

    /// Fetch a single issue outside the loops.
    ///
    /// This is the point-repair path: a failure record's unit is re-invoked
    /// directly, bypassing the enclosing volume and issue iteration.
    pub async fn repair_issue(
        &self,
        volume: u32,
        issue: u32,
        source: &dyn IssueSource,
    ) -> Option<Vec<String>> {
        self.fetch_unit(volume, issue, source).await
    }

    /// Fetch one issue, converting every failure into "no result, logged".
    async fn fetch_unit(
        &self,
        volume: u32,
        issue: u32,
        source: &dyn IssueSource,
    ) -> Option<Vec<String>> {
        match source.fetch_issue(volume, issue).await {
            Ok(links) if !links.is_empty() => Some(links),
            Ok(_) => {
                self.log_failure(&source.issue_url(volume, issue), NO_LINKS_MESSAGE);
                None
            }
            Err(e) => {
                self.log_failure(&source.issue_url(volume, issue), &e.to_string());
                None
            }
        }
    }

    fn log_failure(&self, unit_url: &str, message: &str) {
        debug!("{}: {} -> {}", self.scraper, unit_url, message);
        if let Err(e) = self.ledger.record(self.scraper, unit_url, message) {
            warn!("Failed to record failure for {}: {}", unit_url, e);
        }
    }
}
