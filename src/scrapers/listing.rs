//! Listing strategy: numbered listing pages walked until exhaustion.

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use super::extract::{extract_links, ExtractRules};
use super::{Repaired, ScrapeContext, Strategy};
use crate::fetch::FetchOptions;
use crate::models::{FailureRecord, ScrapeOutput, SourceSpec};
use crate::traversal::NO_LINKS_MESSAGE;

/// Tag resolved by the registry.
pub const TAG: &str = "listing";

/// Listing URL template used when a source declares none.
pub const DEFAULT_PAGE_TEMPLATE: &str = "{base}?page={page}";

/// Walks numbered listing pages, accumulating links until the consecutive
/// miss threshold trips.
pub struct ListingStrategy {
    source: SourceSpec,
    ctx: ScrapeContext,
    options: FetchOptions,
    rules: ExtractRules,
}

impl ListingStrategy {
    pub fn new(source: SourceSpec, ctx: ScrapeContext) -> Self {
        let options = FetchOptions::from_source(&source.config);
        let rules = ExtractRules::new(
            &source.config.link_selectors,
            source.config.link_pattern.as_deref(),
        );
        Self {
            source,
            ctx,
            options,
            rules,
        }
    }

    fn template(&self) -> &str {
        self.source
            .config
            .page_url
            .as_deref()
            .unwrap_or(DEFAULT_PAGE_TEMPLATE)
    }

    fn page_url(&self, page: u32) -> String {
        self.template()
            .replace("{base}", &self.source.base_url)
            .replace("{page}", &page.to_string())
    }

    fn classify_page(&self, url: &str) -> bool {
        let expanded = self.template().replace("{base}", &self.source.base_url);
        let pattern = format!(
            "^{}$",
            regex::escape(&expanded).replace(r"\{page\}", r"\d+")
        );
        Regex::new(&pattern)
            .map(|re| re.is_match(url))
            .unwrap_or(false)
    }

    /// Fetch one page, converting failures into "no result, logged".
    async fn fetch_page(&self, url: &str) -> Option<Vec<String>> {
        let html = match self.ctx.fetcher.fetch_text(url, &self.options).await {
            Ok(html) => html,
            Err(e) => {
                self.log_failure(url, &e.to_string());
                return None;
            }
        };
        let links = extract_links(&html, url, &self.rules);
        if links.is_empty() {
            self.log_failure(url, NO_LINKS_MESSAGE);
            return None;
        }
        Some(links)
    }

    fn log_failure(&self, url: &str, message: &str) {
        debug!("{}: {} -> {}", self.ctx.scraper, url, message);
        if let Err(e) = self.ctx.ledger.record(&self.ctx.scraper, url, message) {
            warn!("Failed to record failure for {}: {}", url, e);
        }
    }
}

#[async_trait]
impl Strategy for ListingStrategy {
    fn source(&self) -> &SourceSpec {
        &self.source
    }

    fn context(&self) -> &ScrapeContext {
        &self.ctx
    }

    async fn scrape(&self) -> anyhow::Result<Option<ScrapeOutput>> {
        let threshold = self.source.miss_threshold.max(1);
        let mut links: Vec<String> = Vec::new();
        let mut misses = 0u32;
        let mut page = self.source.config.start_page;

        loop {
            match self.fetch_page(&self.page_url(page)).await {
                Some(page_links) => {
                    misses = 0;
                    for link in page_links {
                        if !links.contains(&link) {
                            links.push(link);
                        }
                    }
                }
                None => {
                    misses += 1;
                    if misses >= threshold {
                        debug!(
                            "{}: listing {} exhausted at page {}",
                            self.ctx.scraper, self.source.id, page
                        );
                        break;
                    }
                }
            }
            page += 1;
        }

        Ok((!links.is_empty()).then_some(ScrapeOutput::Links(links)))
    }

    async fn repair(&self, failure: &FailureRecord) -> anyhow::Result<Option<Repaired>> {
        if !self.classify_page(&failure.source) {
            return Ok(None);
        }
        Ok(self.fetch_page(&failure.source).await.map(|links| Repaired {
            unit_url: failure.source.clone(),
            links,
            coords: None,
        }))
    }
}
