//! Service layer orchestrating the pipeline phases.

mod analytics;
mod harvest;
mod ingest;
mod repair;

pub use analytics::AnalyticsService;
pub use harvest::{HarvestEvent, HarvestService, HarvestSummary};
pub use ingest::{ResourceStore, UploadStats};
pub use repair::{RepairService, RepairSummary};
