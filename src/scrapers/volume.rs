//! Volume strategy: the hierarchical volume/issue walk.

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use super::extract::{extract_links, ExtractRules};
use super::{Repaired, ScrapeContext, Strategy};
use crate::fetch::FetchOptions;
use crate::models::{FailureRecord, NumericRange, ScrapeOutput, SourceSpec};
use crate::traversal::{IssueSource, TraversalController};

/// Tag resolved by the registry.
pub const TAG: &str = "volume";

/// Issue URL template used when a source declares none.
pub const DEFAULT_ISSUE_TEMPLATE: &str = "{base}/vol/{volume}/issue/{issue}";

/// Walks the declared volume and issue ranges of a journal, optionally
/// dereferencing each extracted link as an article page.
pub struct VolumeStrategy {
    source: SourceSpec,
    ctx: ScrapeContext,
    options: FetchOptions,
    issue_rules: ExtractRules,
    article_rules: ExtractRules,
}

impl VolumeStrategy {
    pub fn new(source: SourceSpec, ctx: ScrapeContext) -> Self {
        let options = FetchOptions::from_source(&source.config);
        let issue_rules = ExtractRules::new(
            &source.config.link_selectors,
            source.config.link_pattern.as_deref(),
        );
        let article_rules = ExtractRules::new(
            &source.config.article_selectors,
            source.config.article_pattern.as_deref(),
        );
        Self {
            source,
            ctx,
            options,
            issue_rules,
            article_rules,
        }
    }

    fn template(&self) -> &str {
        self.source
            .config
            .issue_url
            .as_deref()
            .unwrap_or(DEFAULT_ISSUE_TEMPLATE)
    }

    fn volumes(&self) -> NumericRange {
        self.source.volumes.unwrap_or(NumericRange::new(1, 1))
    }

    fn issues(&self) -> NumericRange {
        self.source.issues.unwrap_or(NumericRange::new(1, 1))
    }

    fn controller(&self) -> TraversalController<'_> {
        TraversalController::new(
            &self.ctx.scraper,
            self.source.miss_threshold,
            &self.ctx.ledger,
        )
    }

    /// Match a unit URL back to its volume/issue coordinates.
    ///
    /// The issue template, expanded for the source's base URL, becomes a
    /// regex with named number groups; a non-matching URL is an article.
    fn classify_issue(&self, url: &str) -> Option<(u32, u32)> {
        let expanded = self.template().replace("{base}", &self.source.base_url);
        let pattern = format!(
            "^{}$",
            regex::escape(&expanded)
                .replace(r"\{volume\}", r"(?P<volume>\d+)")
                .replace(r"\{issue\}", r"(?P<issue>\d+)")
        );
        let re = Regex::new(&pattern).ok()?;
        let caps = re.captures(url)?;
        let volume = caps.name("volume")?.as_str().parse().ok()?;
        let issue = caps.name("issue")?.as_str().parse().ok()?;
        Some((volume, issue))
    }

    /// Fetch an article page and extract the single document link.
    ///
    /// Absence goes to the failure ledger at article granularity.
    async fn deref_article(&self, article_url: &str) -> Option<String> {
        let html = match self
            .ctx
            .fetcher
            .fetch_text(article_url, &self.options)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                self.log_article_failure(article_url, &e.to_string());
                return None;
            }
        };
        match extract_links(&html, article_url, &self.article_rules)
            .into_iter()
            .next()
        {
            Some(link) => Some(link),
            None => {
                self.log_article_failure(article_url, "no document link on article page");
                None
            }
        }
    }

    fn log_article_failure(&self, article_url: &str, message: &str) {
        if let Err(e) = self
            .ctx
            .ledger
            .record(&self.ctx.scraper, article_url, message)
        {
            warn!("Failed to record failure for {}: {}", article_url, e);
        }
    }
}

#[async_trait]
impl IssueSource for VolumeStrategy {
    fn issue_url(&self, volume: u32, issue: u32) -> String {
        self.template()
            .replace("{base}", &self.source.base_url)
            .replace("{volume}", &volume.to_string())
            .replace("{issue}", &issue.to_string())
    }

    async fn fetch_issue(&self, volume: u32, issue: u32) -> anyhow::Result<Vec<String>> {
        let url = self.issue_url(volume, issue);
        let html = self.ctx.fetcher.fetch_text(&url, &self.options).await?;
        let links = extract_links(&html, &url, &self.issue_rules);

        if !self.source.config.article_hop {
            return Ok(links);
        }

        // Multi-hop dereference: each extracted link is an article page
        // holding the real document link.
        let mut resolved = Vec::new();
        for article_url in links {
            if let Some(link) = self.deref_article(&article_url).await {
                resolved.push(link);
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl Strategy for VolumeStrategy {
    fn source(&self) -> &SourceSpec {
        &self.source
    }

    fn context(&self) -> &ScrapeContext {
        &self.ctx
    }

    async fn scrape(&self) -> anyhow::Result<Option<ScrapeOutput>> {
        let tree = self
            .controller()
            .walk_volumes(self.volumes(), self.issues(), self)
            .await;
        Ok((!tree.is_empty()).then_some(ScrapeOutput::Volumes(tree)))
    }

    async fn repair(&self, failure: &FailureRecord) -> anyhow::Result<Option<Repaired>> {
        if let Some((volume, issue)) = self.classify_issue(&failure.source) {
            let links = self.controller().repair_issue(volume, issue, self).await;
            return Ok(links.map(|links| Repaired {
                unit_url: failure.source.clone(),
                links,
                coords: Some((volume, issue)),
            }));
        }

        if self.source.config.article_hop {
            return Ok(self.deref_article(&failure.source).await.map(|link| Repaired {
                unit_url: failure.source.clone(),
                links: vec![link],
                coords: None,
            }));
        }

        Ok(None)
    }
}
