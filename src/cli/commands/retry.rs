//! Retry command.

use std::sync::Arc;

use console::style;

use super::App;
use crate::services::RepairService;

/// Re-fetch failed units for the selected scrapers.
pub async fn cmd_retry(app: &App, names: &[String], upload: bool) -> anyhow::Result<()> {
    let scrapers = app.load_scrapers(names)?;
    let service = RepairService::new(
        app.store.clone(),
        Arc::clone(&app.fetcher),
        Arc::clone(&app.objects),
    );

    for spec in &scrapers {
        let summary = service.run(spec, upload).await?;
        if summary.attempted == 0 {
            println!("  {} {}: nothing to retry", style("✓").green(), spec.name);
            continue;
        }
        println!(
            "  {} {}: {}/{} units repaired ({} links recovered, {} unmatched)",
            style("✓").green(),
            spec.name,
            summary.repaired,
            summary.attempted,
            summary.links,
            summary.unmatched
        );
        if upload && summary.upload.attempted > 0 {
            println!(
                "    uploaded {}/{} retrieved ({} failed)",
                summary.upload.uploaded, summary.upload.retrieved, summary.upload.failed
            );
        }
    }
    Ok(())
}
