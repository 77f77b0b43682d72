//! Strategy dispatch registry.
//!
//! A static mapping from strategy tags to factories. The orchestration that
//! iterates a scraper's sources and merges their outputs into one
//! `source id -> output` map is identical no matter which strategy a tag
//! resolves to.

use tracing::{info, warn};

use super::{direct, listing, volume};
use super::{DirectStrategy, ListingStrategy, ScrapeContext, Strategy, VolumeStrategy};
use crate::models::{ResultTree, ScrapeOutput, SourceSpec};

/// Registered strategy tags, in registration order.
pub const TAGS: &[&str] = &[direct::TAG, volume::TAG, listing::TAG];

/// Resolve a source's strategy tag to a configured strategy instance.
///
/// `None` for an unregistered tag; the caller skips the source.
pub fn resolve(source: &SourceSpec, ctx: &ScrapeContext) -> Option<Box<dyn Strategy>> {
    match source.strategy.as_str() {
        direct::TAG => Some(Box::new(DirectStrategy::new(source.clone(), ctx.clone()))),
        volume::TAG => Some(Box::new(VolumeStrategy::new(source.clone(), ctx.clone()))),
        listing::TAG => Some(Box::new(ListingStrategy::new(source.clone(), ctx.clone()))),
        _ => None,
    }
}

/// Run one source through its strategy's scrape/post_process lifecycle.
///
/// `None` — and never an error — for unregistered tags, empty results, and
/// failed scrapes; the source is simply absent from the aggregated map.
pub async fn dispatch(source: &SourceSpec, ctx: &ScrapeContext) -> Option<ScrapeOutput> {
    let strategy = match resolve(source, ctx) {
        Some(strategy) => strategy,
        None => {
            warn!(
                "{}: skipping source {} with unregistered strategy tag {:?}",
                ctx.scraper, source.id, source.strategy
            );
            return None;
        }
    };

    let output = match strategy.scrape().await {
        Ok(Some(output)) => output,
        Ok(None) => return None,
        Err(e) => {
            warn!("{}: source {} failed: {}", ctx.scraper, source.id, e);
            if let Err(e) = ctx.ledger.record(&ctx.scraper, &source.base_url, &e.to_string()) {
                warn!("Failed to record failure for {}: {}", source.id, e);
            }
            return None;
        }
    };

    match strategy.post_process(output).await {
        Ok(output) if !output.is_empty() => Some(output),
        Ok(_) => None,
        Err(e) => {
            warn!("{}: post-processing {} failed: {}", ctx.scraper, source.id, e);
            None
        }
    }
}

/// Scrape every source of a scraper, merging non-empty outputs.
pub async fn scrape_all(sources: &[SourceSpec], ctx: &ScrapeContext) -> ResultTree {
    let mut tree = ResultTree::new();
    for source in sources {
        match dispatch(source, ctx).await {
            Some(output) => {
                info!(
                    "{}: source {} yielded {} links",
                    ctx.scraper,
                    source.id,
                    output.links().len()
                );
                tree.insert(source.id.clone(), output);
            }
            None => {
                info!("{}: source {} yielded nothing", ctx.scraper, source.id);
            }
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use crate::models::SourceConfig;
    use crate::repository::{FailureLedger, Store};
    use std::sync::Arc;

    fn ctx() -> ScrapeContext {
        ScrapeContext {
            scraper: "acme".to_string(),
            fetcher: Arc::new(StubFetcher::new()),
            ledger: FailureLedger::new(Store::open_in_memory().unwrap()),
        }
    }

    fn direct_source(id: &str, urls: &[&str]) -> SourceSpec {
        SourceSpec {
            id: id.to_string(),
            base_url: String::new(),
            strategy: "direct".to_string(),
            volumes: None,
            issues: None,
            miss_threshold: 3,
            config: SourceConfig {
                urls: urls.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_unregistered_tag_absent_from_map() {
        let mut bogus = direct_source("bogus", &["https://x.org/a.pdf"]);
        bogus.strategy = "teleport".to_string();
        let sources = vec![bogus, direct_source("ok", &["https://x.org/b.pdf"])];

        let tree = scrape_all(&sources, &ctx()).await;
        assert!(!tree.contains_key("bogus"));
        assert!(tree.contains_key("ok"));
    }

    #[tokio::test]
    async fn test_empty_output_absent_from_map() {
        let sources = vec![direct_source("empty", &[])];
        let tree = scrape_all(&sources, &ctx()).await;
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_outputs_merge_under_source_ids() {
        let sources = vec![
            direct_source("a", &["https://x.org/1.pdf"]),
            direct_source("b", &["https://x.org/2.pdf"]),
        ];
        let tree = scrape_all(&sources, &ctx()).await;
        assert_eq!(tree.len(), 2);
        assert_eq!(tree["a"].links(), vec!["https://x.org/1.pdf"]);
        assert_eq!(tree["b"].links(), vec!["https://x.org/2.pdf"]);
    }
}
