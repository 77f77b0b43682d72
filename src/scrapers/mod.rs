//! Scraper strategies and the dispatch registry.
//!
//! Each strategy implements the shared [`Strategy`] capability interface;
//! the [`registry`] resolves a source's strategy tag to a concrete
//! implementation and runs every source through one orchestration loop.

mod direct;
mod extract;
mod listing;
pub mod registry;
mod volume;

pub use direct::DirectStrategy;
pub use extract::{extract_links, ExtractRules};
pub use listing::ListingStrategy;
pub use volume::VolumeStrategy;

use std::sync::Arc;

use async_trait::async_trait;

use crate::fetch::{FetchOptions, Fetcher};
use crate::models::{FailureRecord, ScrapeOutput, SourceSpec};
use crate::repository::FailureLedger;
use crate::services::{ResourceStore, UploadStats};

/// Shared state bound into every strategy at dispatch time.
#[derive(Clone)]
pub struct ScrapeContext {
    /// Logging and namespacing identity of the enclosing scraper.
    pub scraper: String,
    pub fetcher: Arc<dyn Fetcher>,
    pub ledger: FailureLedger,
}

/// A single unit re-fetched by the point-repair path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    /// The failed unit's URL, as recorded in the ledger.
    pub unit_url: String,
    /// Links recovered from the unit.
    pub links: Vec<String>,
    /// Volume/issue position, when the unit URL encodes one.
    pub coords: Option<(u32, u32)>,
}

/// Capability interface shared by all scraping strategies.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn source(&self) -> &SourceSpec;

    fn context(&self) -> &ScrapeContext;

    /// Harvest the source. `None` means the source contributes nothing and
    /// is omitted from the aggregated map.
    async fn scrape(&self) -> anyhow::Result<Option<ScrapeOutput>>;

    /// Post-scrape transformation; identity unless a strategy overrides it.
    async fn post_process(&self, output: ScrapeOutput) -> anyhow::Result<ScrapeOutput> {
        Ok(output)
    }

    /// Ingest and upload the harvested links through the resource store.
    async fn upload(
        &self,
        output: &ScrapeOutput,
        store: &ResourceStore,
    ) -> anyhow::Result<UploadStats> {
        let ctx = self.context();
        let source = self.source();
        let root_key = format!("{}/{}", ctx.scraper, source.id);
        let options = FetchOptions::from_source(&source.config);
        Ok(store
            .ingest_and_upload(
                &ctx.scraper,
                &root_key,
                &output.links(),
                ctx.fetcher.as_ref(),
                &options,
                &ctx.ledger,
            )
            .await)
    }

    /// Re-invoke the single unit a failure record points at, bypassing the
    /// enclosing traversal loops. `None` when the unit is still broken or
    /// the strategy cannot address it.
    async fn repair(&self, _failure: &FailureRecord) -> anyhow::Result<Option<Repaired>> {
        Ok(None)
    }
}
