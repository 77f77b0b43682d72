//! Direct strategy: literally configured URLs, no fetching.

use async_trait::async_trait;

use super::{ScrapeContext, Strategy};
use crate::models::{ScrapeOutput, SourceSpec};

/// Tag resolved by the registry.
pub const TAG: &str = "direct";

/// Returns the configured URL list unprocessed.
pub struct DirectStrategy {
    source: SourceSpec,
    ctx: ScrapeContext,
}

impl DirectStrategy {
    pub fn new(source: SourceSpec, ctx: ScrapeContext) -> Self {
        Self { source, ctx }
    }
}

#[async_trait]
impl Strategy for DirectStrategy {
    fn source(&self) -> &SourceSpec {
        &self.source
    }

    fn context(&self) -> &ScrapeContext {
        &self.ctx
    }

    async fn scrape(&self) -> anyhow::Result<Option<ScrapeOutput>> {
        let urls = &self.source.config.urls;
        if urls.is_empty() {
            return Ok(None);
        }
        Ok(Some(ScrapeOutput::Links(urls.clone())))
    }
}
