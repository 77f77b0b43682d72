//! Selector-based link extraction from fetched pages.

use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

/// Compiled extraction rules: CSS selectors plus an optional href filter.
#[derive(Debug, Clone)]
pub struct ExtractRules {
    selectors: Vec<String>,
    pattern: Option<Regex>,
}

impl ExtractRules {
    /// Compile rules, falling back to plain `a` when no selector is given.
    /// Invalid patterns are dropped with a warning rather than failing the
    /// whole source.
    pub fn new(selectors: &[String], pattern: Option<&str>) -> Self {
        let selectors = if selectors.is_empty() {
            vec!["a".to_string()]
        } else {
            selectors.to_vec()
        };
        let pattern = pattern.and_then(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Ignoring invalid link pattern {:?}: {}", p, e);
                None
            }
        });
        Self { selectors, pattern }
    }
}

/// Extract candidate links from a page, resolved against its URL.
///
/// Order follows document order; duplicates are dropped.
pub fn extract_links(html: &str, page_url: &str, rules: &ExtractRules) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for selector_str in &rules.selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => {
                warn!("Skipping invalid selector {:?}", selector_str);
                continue;
            }
        };

        for element in document.select(&selector) {
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };

            if let Some(ref pattern) = rules.pattern {
                if !pattern.is_match(href) {
                    continue;
                }
            }

            let full_url = match Url::parse(page_url).and_then(|base| base.join(href)) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            };

            if !links.contains(&full_url) {
                links.push(full_url);
            }
        }
    }

    links
}
