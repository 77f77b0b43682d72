//! Repository layer for database persistence.
//!
//! All access goes through a generic SQLite-backed [`Store`] offering
//! `insert`/`update`/`search` over declared tables; the typed repositories
//! in this module sit on top of it.

mod analytics;
mod failures;
mod outputs;
mod resources;
mod schema;
mod store;

pub use analytics::AnalyticsRepository;
pub use failures::FailureLedger;
pub use outputs::OutputRepository;
pub use resources::ResourceRepository;
pub use schema::tables;
pub use store::{FieldType, Order, Row, Store, StoreError, TableSchema};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_round_trip() {
        let now = Utc::now();
        let parsed = parse_datetime(&now.to_rfc3339());
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn test_parse_datetime_invalid_defaults_to_epoch() {
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
    }
}
