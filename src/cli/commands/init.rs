//! Initialize command.

use std::fs;

use console::style;

use std::path::Path;

use crate::config::{Settings, EXAMPLE_SETTINGS, EXAMPLE_SOURCES};
use crate::repository::Store;

/// Create the database, library directory, and a starter source catalog.
pub fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    if let Some(parent) = settings.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::create_dir_all(&settings.library_root)?;
    Store::open(&settings.database_path)?;
    println!(
        "  {} Database at {}",
        style("✓").green(),
        settings.database_path.display()
    );
    println!(
        "  {} Library at {}",
        style("✓").green(),
        settings.library_root.display()
    );

    let settings_path = Path::new("periodica.toml");
    if !settings_path.exists() {
        fs::write(settings_path, EXAMPLE_SETTINGS)?;
        println!(
            "  {} Wrote starter settings to {}",
            style("✓").green(),
            settings_path.display()
        );
    }

    if settings.sources_file.exists() {
        println!(
            "  {} Source catalog already exists at {}",
            style("!").yellow(),
            settings.sources_file.display()
        );
    } else {
        fs::write(&settings.sources_file, EXAMPLE_SOURCES)?;
        println!(
            "  {} Wrote starter catalog to {}",
            style("✓").green(),
            settings.sources_file.display()
        );
        println!("    Edit it to describe your scrapers, then run `periodica harvest`");
    }
    Ok(())
}
