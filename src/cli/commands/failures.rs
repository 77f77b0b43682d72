//! Failures command.

use console::style;

use super::App;
use crate::repository::FailureLedger;

/// Print the failure ledger for one scraper.
pub fn cmd_failures(app: &App, scraper: &str, history: bool) -> anyhow::Result<()> {
    let ledger = FailureLedger::new(app.store.clone());
    let records = if history {
        ledger.all(scraper)?
    } else {
        ledger.latest_failures(scraper)?
    };

    if records.is_empty() {
        println!("{} No recorded failures for {}", style("✓").green(), scraper);
        return Ok(());
    }

    println!(
        "{} failure(s) for {}{}:",
        records.len(),
        scraper,
        if history { " (full history)" } else { "" }
    );
    for record in &records {
        println!(
            "  {}  {}  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.source,
            style(&record.message).dim()
        );
    }
    Ok(())
}
