//! Source declarations for publisher sites.
//!
//! A scraper corresponds to one publisher and groups any number of logical
//! sources (journals). Each source carries a strategy tag plus the
//! strategy-specific configuration resolved by the dispatch registry.

use serde::{Deserialize, Serialize};

/// Default number of consecutive empty/failed issues before a volume is
/// abandoned.
pub const DEFAULT_MISS_THRESHOLD: u32 = 3;

/// A top-level scraper: one publisher, harvested by one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSpec {
    /// Scraper name. Namespaces failures, resources, and output rows.
    pub name: String,
    /// Logical sources harvested under this scraper.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl ScraperSpec {
    /// Find a source owning the given unit URL.
    ///
    /// Used by the retry path to map a failure record back to the source
    /// whose strategy can re-fetch the unit.
    pub fn source_for_url(&self, url: &str) -> Option<&SourceSpec> {
        self.sources
            .iter()
            .filter(|s| !s.base_url.is_empty() && url.starts_with(&s.base_url))
            .max_by_key(|s| s.base_url.len())
    }
}

/// One journal (or other logical source) within a scraper.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Identifier used as the key in the result tree.
    pub id: String,
    /// Base URL, also used to attribute failure records back to a source.
    #[serde(default)]
    pub base_url: String,
    /// Strategy tag resolved by the dispatch registry.
    pub strategy: String,
    /// Volume numbers to walk (volume strategy).
    #[serde(default)]
    pub volumes: Option<NumericRange>,
    /// Issue numbers to walk within each volume (volume strategy).
    #[serde(default)]
    pub issues: Option<NumericRange>,
    /// Consecutive empty/failed issues before the current volume is abandoned.
    #[serde(default = "default_miss_threshold")]
    pub miss_threshold: u32,
    /// Strategy-specific configuration.
    #[serde(default)]
    pub config: SourceConfig,
}

fn default_miss_threshold() -> u32 {
    DEFAULT_MISS_THRESHOLD
}

/// An inclusive numeric range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub start: u32,
    pub end: u32,
}

impl NumericRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Strategy-specific configuration knobs.
///
/// A single struct shared by all strategies; each reads only the fields it
/// understands, the rest stay at their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Issue page URL template with `{base}`, `{volume}` and `{issue}`
    /// placeholders (volume strategy).
    #[serde(default)]
    pub issue_url: Option<String>,
    /// Listing page URL template with `{base}` and `{page}` placeholders
    /// (listing strategy).
    #[serde(default)]
    pub page_url: Option<String>,
    /// First listing page number (listing strategy, default 1).
    #[serde(default = "default_start_page")]
    pub start_page: u32,
    /// Literal URLs returned unprocessed (direct strategy).
    #[serde(default)]
    pub urls: Vec<String>,
    /// CSS selectors for candidate document links.
    #[serde(default)]
    pub link_selectors: Vec<String>,
    /// Regex filter applied to extracted hrefs.
    #[serde(default)]
    pub link_pattern: Option<String>,
    /// Dereference each extracted link as an article page holding the real
    /// document link (volume strategy).
    #[serde(default)]
    pub article_hop: bool,
    /// CSS selectors for the document link on an article page.
    #[serde(default)]
    pub article_selectors: Vec<String>,
    /// Regex filter applied to hrefs on article pages.
    #[serde(default)]
    pub article_pattern: Option<String>,
    /// Cookie-acceptance selector passed through to the page fetcher.
    #[serde(default)]
    pub cookie_selector: Option<String>,
    /// Element the fetcher should wait for before extracting.
    #[serde(default)]
    pub wait_for: Option<String>,
    /// Route requests for this source through the configured proxy.
    #[serde(default)]
    pub use_proxy: bool,
}

fn default_start_page() -> u32 {
    1
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            issue_url: None,
            page_url: None,
            start_page: default_start_page(),
            urls: Vec::new(),
            link_selectors: Vec::new(),
            link_pattern: None,
            article_hop: false,
            article_selectors: Vec::new(),
            article_pattern: None,
            cookie_selector: None,
            wait_for: None,
            use_proxy: false,
        }
    }
}

impl SourceConfig {
    /// Expand the issue URL template for one issue.
    pub fn issue_url_for(&self, base: &str, volume: u32, issue: u32) -> Option<String> {
        self.issue_url.as_ref().map(|t| {
            t.replace("{base}", base)
                .replace("{volume}", &volume.to_string())
                .replace("{issue}", &issue.to_string())
        })
    }

    /// Expand the listing URL template for one page.
    pub fn page_url_for(&self, base: &str, page: u32) -> Option<String> {
        self.page_url
            .as_ref()
            .map(|t| t.replace("{base}", base).replace("{page}", &page.to_string()))
    }
}
