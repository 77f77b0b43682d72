//! Ingest command.
//!
//! Retrieves and uploads content for links already present in a scraper's
//! saved output record, skipping links that were uploaded earlier. Useful
//! after a scrape-only harvest or a partial upload.

use std::sync::Arc;

use console::style;

use super::App;
use crate::fetch::FetchOptions;
use crate::repository::{FailureLedger, OutputRepository, ResourceRepository};
use crate::services::{ResourceStore, UploadStats};

pub async fn cmd_ingest(app: &App, names: &[String]) -> anyhow::Result<()> {
    let scrapers = app.load_scrapers(names)?;
    let outputs = OutputRepository::new(app.store.clone());
    let resources = ResourceRepository::new(app.store.clone());
    let ledger = FailureLedger::new(app.store.clone());
    let store = ResourceStore::new(resources.clone(), Arc::clone(&app.objects));

    for spec in &scrapers {
        let tree = match outputs.load(&spec.name)? {
            Some(tree) => tree,
            None => {
                println!(
                    "  {} {}: no output record; harvest first",
                    style("!").yellow(),
                    spec.name
                );
                continue;
            }
        };

        let mut stats = UploadStats::default();
        for source in &spec.sources {
            let output = match tree.get(&source.id) {
                Some(output) => output,
                None => continue,
            };
            let mut pending = Vec::new();
            for link in output.links() {
                if !resources.is_uploaded(&spec.name, link)? {
                    pending.push(link);
                }
            }
            if pending.is_empty() {
                continue;
            }
            let root_key = format!("{}/{}", spec.name, source.id);
            let batch = store
                .ingest_and_upload(
                    &spec.name,
                    &root_key,
                    &pending,
                    app.fetcher.as_ref(),
                    &FetchOptions::from_source(&source.config),
                    &ledger,
                )
                .await;
            stats.merge(batch);
        }
        println!(
            "  {} {}: {} attempted, {} uploaded, {} failed",
            style("✓").green(),
            spec.name,
            stats.attempted,
            stats.uploaded,
            stats.failed
        );
    }
    Ok(())
}
