//! Data models for Periodica.

mod analytics;
mod failure;
mod resource;
mod source;
mod tree;

pub use analytics::{AnalyticsSnapshot, PhaseStats};
pub use failure::FailureRecord;
pub use resource::ResourceRecord;
pub use source::{NumericRange, ScraperSpec, SourceConfig, SourceSpec, DEFAULT_MISS_THRESHOLD};
pub use tree::{all_links, ResultTree, ScrapeOutput, VolumeTree};
