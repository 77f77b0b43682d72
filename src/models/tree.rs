//! Nested scrape result trees.
//!
//! Results map journal -> volume -> issue -> ordered document links. A unit
//! that produced nothing is omitted from its parent map rather than stored
//! as an empty entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Volume -> issue -> ordered link list for one journal.
pub type VolumeTree = BTreeMap<u32, BTreeMap<u32, Vec<String>>>;

/// Aggregated output for one scraper: source id -> strategy output.
pub type ResultTree = BTreeMap<String, ScrapeOutput>;

/// Output of a single strategy invocation.
///
/// Direct and listing strategies produce a flat link list, the volume
/// strategy produces the nested hierarchy. Both serialize into the persisted
/// output record unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeOutput {
    /// Flat ordered link list.
    Links(Vec<String>),
    /// Nested volume/issue hierarchy.
    Volumes(VolumeTree),
}

impl ScrapeOutput {
    /// True when the output holds no links at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Links(links) => links.is_empty(),
            Self::Volumes(tree) => tree.is_empty(),
        }
    }

    /// Iterate every harvested link in order.
    pub fn links(&self) -> Vec<&str> {
        match self {
            Self::Links(links) => links.iter().map(String::as_str).collect(),
            Self::Volumes(tree) => tree
                .values()
                .flat_map(|issues| issues.values())
                .flat_map(|links| links.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Insert links at a volume/issue position, creating parents as needed.
    ///
    /// No-op for empty link lists and for flat outputs, which have no
    /// hierarchy to address into.
    pub fn insert_issue(&mut self, volume: u32, issue: u32, links: Vec<String>) {
        if links.is_empty() {
            return;
        }
        if let Self::Volumes(tree) = self {
            tree.entry(volume).or_default().insert(issue, links);
        }
    }
}

/// Collect every link across a scraper's aggregated result tree.
pub fn all_links(tree: &ResultTree) -> Vec<String> {
    tree.values()
        .flat_map(|output| output.links())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_output() -> ScrapeOutput {
        let mut tree = VolumeTree::new();
        tree.entry(1)
            .or_default()
            .insert(1, vec!["a.pdf".to_string()]);
        tree.entry(2)
            .or_default()
            .insert(3, vec!["b.pdf".to_string(), "c.pdf".to_string()]);
        ScrapeOutput::Volumes(tree)
    }

    #[test]
    fn test_links_flatten_in_order() {
        assert_eq!(volume_output().links(), vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_json_round_trip() {
        let output = volume_output();
        let json = serde_json::to_string(&output).unwrap();
        let back: ScrapeOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_insert_issue_skips_empty() {
        let mut output = ScrapeOutput::Volumes(VolumeTree::new());
        output.insert_issue(1, 1, Vec::new());
        assert!(output.is_empty());

        output.insert_issue(1, 1, vec!["a.pdf".to_string()]);
        assert_eq!(output.links(), vec!["a.pdf"]);
    }

    #[test]
    fn test_all_links_across_sources() {
        let mut tree = ResultTree::new();
        tree.insert("flat".to_string(), ScrapeOutput::Links(vec!["x.pdf".to_string()]));
        tree.insert("nested".to_string(), volume_output());
        let links = all_links(&tree);
        assert_eq!(links.len(), 4);
        assert!(links.contains(&"x.pdf".to_string()));
    }
}
