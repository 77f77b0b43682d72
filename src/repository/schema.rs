//! Declared table schemas.

use super::store::{FieldType, TableSchema};

/// All entity tables, created on open.
pub fn tables() -> Vec<TableSchema> {
    vec![
        // Append-only failure ledger. No uniqueness constraint: repeated
        // failures for the same (scraper, source) accumulate over time.
        TableSchema {
            name: "failures",
            fields: &[
                ("id", FieldType::Id),
                ("scraper", FieldType::Text),
                ("source", FieldType::Text),
                ("message", FieldType::Text),
                ("created_at", FieldType::Timestamp),
            ],
            indexes: &[&["scraper", "source"]],
        },
        // One row per ingestion attempt. content_hash is NULL when
        // retrieval failed; bytes never land here.
        TableSchema {
            name: "resources",
            fields: &[
                ("id", FieldType::Id),
                ("scraper", FieldType::Text),
                ("dest_key", FieldType::Text),
                ("source_url", FieldType::Text),
                ("content_hash", FieldType::Text),
                ("content_retrieved", FieldType::Boolean),
                ("uploaded", FieldType::Boolean),
                ("error", FieldType::Text),
                ("created_at", FieldType::Timestamp),
            ],
            indexes: &[&["scraper", "content_hash"], &["scraper", "source_url"]],
        },
        // One row per scraper, overwritten on each run.
        TableSchema {
            name: "outputs",
            fields: &[
                ("scraper", FieldType::TextId),
                ("result_json", FieldType::Text),
                ("updated_at", FieldType::Timestamp),
            ],
            indexes: &[],
        },
        // Append-only analytics snapshots; the latest row per scraper is
        // the canonical read.
        TableSchema {
            name: "analytics",
            fields: &[
                ("id", FieldType::Id),
                ("scraper", FieldType::Text),
                ("snapshot_json", FieldType::Text),
                ("created_at", FieldType::Timestamp),
            ],
            indexes: &[&["scraper", "created_at"]],
        },
    ]
}
