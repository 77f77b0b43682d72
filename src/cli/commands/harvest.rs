//! Harvest command.

use std::sync::Arc;

use console::style;

use super::App;
use crate::services::HarvestService;

/// Harvest the selected scrapers, optionally uploading content.
pub async fn cmd_harvest(app: &App, names: &[String], upload: bool) -> anyhow::Result<()> {
    let scrapers = app.load_scrapers(names)?;
    if scrapers.is_empty() {
        println!(
            "{} No scrapers configured; run `periodica init` first",
            style("!").yellow()
        );
        return Ok(());
    }

    println!(
        "Harvesting {} scraper(s){}",
        scrapers.len(),
        if upload { "" } else { " (scrape only)" }
    );
    let service = HarvestService::new(
        app.store.clone(),
        Arc::clone(&app.fetcher),
        Arc::clone(&app.objects),
    );
    let summary = service.run(&scrapers, upload).await;

    for event in &summary.events {
        println!("  {}", event);
    }
    println!(
        "{} {} scraper(s) completed, {} failed, {} links",
        style("✓").green(),
        summary.completed,
        summary.failed,
        summary.links
    );
    if upload {
        println!(
            "  uploaded {}/{} retrieved ({} failed)",
            summary.upload.uploaded, summary.upload.retrieved, summary.upload.failed
        );
    }
    if summary.failed > 0 {
        anyhow::bail!("{} scraper(s) failed", summary.failed);
    }
    Ok(())
}
