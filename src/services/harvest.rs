//! Concurrent harvest orchestration.
//!
//! One worker task per scraper; workers report progress over a channel
//! that the driver drains after every worker has joined, so a slow or
//! failing scraper never blocks the others' results.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{ResourceStore, UploadStats};
use crate::fetch::Fetcher;
use crate::models::ScraperSpec;
use crate::repository::{FailureLedger, OutputRepository, ResourceRepository, Store};
use crate::scrapers::{registry, ScrapeContext};
use crate::storage::ObjectStore;

/// Progress report emitted by one harvest worker.
#[derive(Debug, Clone)]
pub enum HarvestEvent {
    Started { scraper: String },
    SourceDone { scraper: String, source: String, links: usize },
    SourceSkipped { scraper: String, source: String },
    Finished { scraper: String, links: usize, upload: UploadStats },
}

impl fmt::Display for HarvestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestEvent::Started { scraper } => write!(f, "{}: started", scraper),
            HarvestEvent::SourceDone { scraper, source, links } => {
                write!(f, "{}: source {} yielded {} links", scraper, source, links)
            }
            HarvestEvent::SourceSkipped { scraper, source } => {
                write!(f, "{}: source {} yielded nothing", scraper, source)
            }
            HarvestEvent::Finished { scraper, links, upload } => write!(
                f,
                "{}: finished with {} links ({} retrieved, {} uploaded, {} failed)",
                scraper, links, upload.retrieved, upload.uploaded, upload.failed
            ),
        }
    }
}

/// Aggregate outcome of one harvest run.
#[derive(Debug, Default)]
pub struct HarvestSummary {
    /// Scrapers that completed their walk.
    pub completed: usize,
    /// Scrapers whose worker failed outright.
    pub failed: usize,
    /// Links harvested across all scrapers.
    pub links: usize,
    /// Combined ingest/upload counters.
    pub upload: UploadStats,
    /// Worker progress events, in arrival order.
    pub events: Vec<HarvestEvent>,
}

/// Drives concurrent harvests over shared metadata and object stores.
pub struct HarvestService {
    store: Store,
    fetcher: Arc<dyn Fetcher>,
    objects: Arc<dyn ObjectStore>,
}

impl HarvestService {
    pub fn new(store: Store, fetcher: Arc<dyn Fetcher>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, fetcher, objects }
    }

    /// Harvest every scraper concurrently.
    ///
    /// With `upload` set, each source's links are ingested and persisted
    /// to the object store after scraping. A worker failure is counted
    /// and logged; it never aborts the sibling workers.
    pub async fn run(&self, scrapers: &[ScraperSpec], upload: bool) -> HarvestSummary {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(scrapers.len());

        for spec in scrapers {
            let spec = spec.clone();
            let store = self.store.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let objects = Arc::clone(&self.objects);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                harvest_one(spec, store, fetcher, objects, upload, tx).await
            }));
        }
        drop(tx);

        let mut summary = HarvestSummary::default();
        for handle in handles {
            match handle.await {
                Ok(Ok((links, stats))) => {
                    summary.completed += 1;
                    summary.links += links;
                    summary.upload.merge(stats);
                }
                Ok(Err(e)) => {
                    summary.failed += 1;
                    warn!("Harvest worker failed: {}", e);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Harvest worker panicked: {}", e);
                }
            }
        }
        while let Some(event) = rx.recv().await {
            summary.events.push(event);
        }
        summary
    }
}

async fn harvest_one(
    spec: ScraperSpec,
    store: Store,
    fetcher: Arc<dyn Fetcher>,
    objects: Arc<dyn ObjectStore>,
    upload: bool,
    tx: mpsc::UnboundedSender<HarvestEvent>,
) -> anyhow::Result<(usize, UploadStats)> {
    let ctx = ScrapeContext {
        scraper: spec.name.clone(),
        fetcher,
        ledger: FailureLedger::new(store.clone()),
    };
    let _ = tx.send(HarvestEvent::Started { scraper: spec.name.clone() });
    info!("{}: harvesting {} sources", spec.name, spec.sources.len());

    let tree = registry::scrape_all(&spec.sources, &ctx).await;
    for source in &spec.sources {
        let event = match tree.get(&source.id) {
            Some(output) => HarvestEvent::SourceDone {
                scraper: spec.name.clone(),
                source: source.id.clone(),
                links: output.links().len(),
            },
            None => HarvestEvent::SourceSkipped {
                scraper: spec.name.clone(),
                source: source.id.clone(),
            },
        };
        let _ = tx.send(event);
    }
    OutputRepository::new(store.clone()).save(&spec.name, &tree)?;

    let mut stats = UploadStats::default();
    if upload {
        let resources = ResourceStore::new(ResourceRepository::new(store), objects);
        for source in &spec.sources {
            let output = match tree.get(&source.id) {
                Some(output) => output,
                None => continue,
            };
            let strategy = match registry::resolve(source, &ctx) {
                Some(strategy) => strategy,
                None => continue,
            };
            match strategy.upload(output, &resources).await {
                Ok(s) => stats.merge(s),
                Err(e) => {
                    warn!("{}: upload for source {} failed: {}", spec.name, source.id, e);
                }
            }
        }
    }

    let links = crate::models::all_links(&tree).len();
    let _ = tx.send(HarvestEvent::Finished {
        scraper: spec.name.clone(),
        links,
        upload: stats,
    });
    Ok((links, stats))
}
