//! Analytics command.

use console::style;

use super::App;
use crate::models::PhaseStats;
use crate::services::AnalyticsService;

/// Compute (or reprint) the pipeline analytics for one scraper.
pub fn cmd_analytics(app: &App, scraper: &str, last: bool) -> anyhow::Result<()> {
    let service = AnalyticsService::new(app.store.clone());
    let snapshot = if last {
        match service.latest(scraper)? {
            Some(snapshot) => snapshot,
            None => {
                println!(
                    "{} No snapshots recorded for {}",
                    style("!").yellow(),
                    scraper
                );
                return Ok(());
            }
        }
    } else {
        service.snapshot(scraper)?
    };

    println!(
        "{} as of {}:",
        scraper,
        snapshot.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    print_phase("scraped", &snapshot.scraped);
    print_phase("retrieved", &snapshot.content_retrieved);
    print_phase("uploaded", &snapshot.uploaded);
    Ok(())
}

fn print_phase(name: &str, stats: &PhaseStats) {
    println!(
        "  {:>10}  {}/{} ({:.1}%)",
        name,
        stats.success_count,
        stats.success_count + stats.failure_count,
        stats.ratio * 100.0
    );
}
