//! Point repair of previously failed units.
//!
//! The retry path reads the newest failure per unit from the ledger, maps
//! each unit URL back to its owning source, and asks the source's strategy
//! to re-fetch just that unit. Recovered links are merged into the saved
//! output record; the ledger itself is never rewritten, so history keeps
//! every attempt.

use std::sync::Arc;

use tracing::{info, warn};

use super::{ResourceStore, UploadStats};
use crate::fetch::{FetchOptions, Fetcher};
use crate::models::{ResultTree, ScrapeOutput, ScraperSpec, VolumeTree};
use crate::repository::{FailureLedger, OutputRepository, ResourceRepository, Store};
use crate::scrapers::{registry, Repaired, ScrapeContext};
use crate::storage::ObjectStore;

/// Outcome of one repair pass over a scraper's ledger.
#[derive(Debug, Default)]
pub struct RepairSummary {
    /// Distinct failed units considered.
    pub attempted: usize,
    /// Units that yielded links on re-fetch.
    pub repaired: usize,
    /// Units with no owning source or an unregistered strategy.
    pub unmatched: usize,
    /// Links recovered across all repaired units.
    pub links: usize,
    /// Ingest/upload counters when uploading was requested.
    pub upload: UploadStats,
}

/// Re-fetches failed units and folds recovered links into saved output.
pub struct RepairService {
    store: Store,
    fetcher: Arc<dyn Fetcher>,
    objects: Arc<dyn ObjectStore>,
}

impl RepairService {
    pub fn new(store: Store, fetcher: Arc<dyn Fetcher>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, fetcher, objects }
    }

    /// Repair one scraper's outstanding failures.
    ///
    /// Each failed unit is re-fetched through its source's strategy; the
    /// surrounding traversal loops are never re-entered. Units that are
    /// still broken stay in the ledger untouched.
    pub async fn run(&self, spec: &ScraperSpec, upload: bool) -> anyhow::Result<RepairSummary> {
        let ledger = FailureLedger::new(self.store.clone());
        let failures = ledger.latest_failures(&spec.name)?;
        let ctx = ScrapeContext {
            scraper: spec.name.clone(),
            fetcher: Arc::clone(&self.fetcher),
            ledger: ledger.clone(),
        };
        let outputs = OutputRepository::new(self.store.clone());
        let mut tree = outputs.load(&spec.name)?.unwrap_or_default();
        let resources = ResourceStore::new(
            ResourceRepository::new(self.store.clone()),
            Arc::clone(&self.objects),
        );

        let mut summary = RepairSummary::default();
        for failure in &failures {
            summary.attempted += 1;
            let source = match spec.source_for_url(&failure.source) {
                Some(source) => source,
                None => {
                    warn!(
                        "{}: no source owns failed unit {}",
                        spec.name, failure.source
                    );
                    summary.unmatched += 1;
                    continue;
                }
            };
            let strategy = match registry::resolve(source, &ctx) {
                Some(strategy) => strategy,
                None => {
                    warn!(
                        "{}: source {} has unregistered strategy tag {:?}",
                        spec.name, source.id, source.strategy
                    );
                    summary.unmatched += 1;
                    continue;
                }
            };

            match strategy.repair(failure).await {
                Ok(Some(repaired)) => {
                    info!(
                        "{}: recovered {} links from {}",
                        spec.name,
                        repaired.links.len(),
                        repaired.unit_url
                    );
                    summary.repaired += 1;
                    summary.links += repaired.links.len();
                    if upload {
                        let root_key = format!("{}/{}", spec.name, source.id);
                        let links: Vec<&str> =
                            repaired.links.iter().map(String::as_str).collect();
                        let stats = resources
                            .ingest_and_upload(
                                &spec.name,
                                &root_key,
                                &links,
                                self.fetcher.as_ref(),
                                &FetchOptions::from_source(&source.config),
                                &ledger,
                            )
                            .await;
                        summary.upload.merge(stats);
                    }
                    merge_repaired(&mut tree, &source.id, repaired);
                }
                Ok(None) => {
                    info!("{}: unit {} is still broken", spec.name, failure.source);
                }
                Err(e) => {
                    warn!("{}: repairing {} failed: {}", spec.name, failure.source, e);
                }
            }
        }

        if summary.repaired > 0 {
            outputs.save(&spec.name, &tree)?;
        }
        Ok(summary)
    }
}

/// Fold a repaired unit's links into a source's saved output.
fn merge_repaired(tree: &mut ResultTree, source_id: &str, repaired: Repaired) {
    if repaired.links.is_empty() {
        return;
    }
    match repaired.coords {
        Some((volume, issue)) => {
            tree.entry(source_id.to_string())
                .or_insert_with(|| ScrapeOutput::Volumes(VolumeTree::new()))
                .insert_issue(volume, issue, repaired.links);
        }
        None => {
            let output = tree
                .entry(source_id.to_string())
                .or_insert_with(|| ScrapeOutput::Links(Vec::new()));
            if let ScrapeOutput::Links(links) = output {
                for link in repaired.links {
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use crate::models::{NumericRange, SourceConfig, SourceSpec};
    use crate::storage::FsObjectStore;
    use tempfile::tempdir;

    fn volume_source() -> SourceSpec {
        SourceSpec {
            id: "jot".to_string(),
            base_url: "https://x.org/jot".to_string(),
            strategy: "volume".to_string(),
            volumes: Some(NumericRange::new(1, 2)),
            issues: Some(NumericRange::new(1, 2)),
            miss_threshold: 3,
            config: SourceConfig {
                issue_url: Some("{base}/vol/{volume}/issue/{issue}".to_string()),
                ..SourceConfig::default()
            },
        }
    }

    fn spec() -> ScraperSpec {
        ScraperSpec {
            name: "acme".to_string(),
            sources: vec![volume_source()],
        }
    }

    fn issue_page(links: &[&str]) -> String {
        let anchors: Vec<String> = links
            .iter()
            .map(|l| format!("<a href=\"{}\">doc</a>", l))
            .collect();
        format!("<html><body>{}</body></html>", anchors.join(""))
    }

    #[tokio::test]
    async fn test_repair_merges_recovered_issue_into_output() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let ledger = FailureLedger::new(store.clone());
        ledger
            .record("acme", "https://x.org/jot/vol/1/issue/2", "no links extracted")
            .unwrap();

        let fetcher = StubFetcher::new().with_page(
            "https://x.org/jot/vol/1/issue/2",
            issue_page(&["https://x.org/jot/a.pdf"]),
        );
        let service = RepairService::new(
            store.clone(),
            Arc::new(fetcher),
            Arc::new(FsObjectStore::new(dir.path())),
        );

        let summary = service.run(&spec(), false).await.unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.repaired, 1);
        assert_eq!(summary.links, 1);

        let tree = OutputRepository::new(store).load("acme").unwrap().unwrap();
        assert_eq!(tree["jot"].links(), vec!["https://x.org/jot/a.pdf"]);
    }

    #[tokio::test]
    async fn test_still_broken_unit_saves_nothing() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let ledger = FailureLedger::new(store.clone());
        ledger
            .record("acme", "https://x.org/jot/vol/1/issue/2", "no links extracted")
            .unwrap();

        let service = RepairService::new(
            store.clone(),
            Arc::new(StubFetcher::new()),
            Arc::new(FsObjectStore::new(dir.path())),
        );

        let summary = service.run(&spec(), false).await.unwrap();
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.repaired, 0);
        assert!(OutputRepository::new(store).load("acme").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unit_without_owning_source_is_unmatched() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let ledger = FailureLedger::new(store.clone());
        ledger
            .record("acme", "https://elsewhere.org/doc", "no links extracted")
            .unwrap();

        let service = RepairService::new(
            store.clone(),
            Arc::new(StubFetcher::new()),
            Arc::new(FsObjectStore::new(dir.path())),
        );

        let summary = service.run(&spec(), false).await.unwrap();
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.repaired, 0);
    }

    #[tokio::test]
    async fn test_repair_preserves_ledger_history() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let ledger = FailureLedger::new(store.clone());
        ledger
            .record("acme", "https://x.org/jot/vol/1/issue/2", "no links extracted")
            .unwrap();

        let fetcher = StubFetcher::new().with_page(
            "https://x.org/jot/vol/1/issue/2",
            issue_page(&["https://x.org/jot/a.pdf"]),
        );
        let service = RepairService::new(
            store.clone(),
            Arc::new(fetcher),
            Arc::new(FsObjectStore::new(dir.path())),
        );
        service.run(&spec(), false).await.unwrap();

        assert_eq!(ledger.all("acme").unwrap().len(), 1);
    }

    #[test]
    fn test_merge_flat_links_dedups_in_order() {
        let mut tree = ResultTree::new();
        tree.insert(
            "jot".to_string(),
            ScrapeOutput::Links(vec!["a.pdf".to_string()]),
        );
        merge_repaired(
            &mut tree,
            "jot",
            Repaired {
                unit_url: "https://x.org/page/2".to_string(),
                links: vec!["a.pdf".to_string(), "b.pdf".to_string()],
                coords: None,
            },
        );
        assert_eq!(tree["jot"].links(), vec!["a.pdf", "b.pdf"]);
    }
}
