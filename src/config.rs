//! Configuration loading.
//!
//! Runtime settings come from an optional TOML file with environment
//! overrides on top; the source catalog is a separate TOML file listing
//! every scraper and its sources. Relative paths in the settings file
//! resolve against the file's own directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::ScraperSpec;

pub const DEFAULT_DATABASE: &str = "periodica.db";
pub const DEFAULT_LIBRARY: &str = "library";
pub const DEFAULT_SOURCES: &str = "sources.toml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DELAY_MS: u64 = 500;
pub const DEFAULT_JITTER_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite metadata database path.
    pub database_path: PathBuf,
    /// Root directory of the content-addressed object store.
    pub library_root: PathBuf,
    /// Source catalog path.
    pub sources_file: PathBuf,
    pub request_timeout_secs: u64,
    /// Base delay between requests to one host.
    pub request_delay_ms: u64,
    /// Random jitter added on top of the base delay.
    pub delay_jitter_ms: u64,
    /// SOCKS or HTTP proxy URL for sources that request one.
    pub proxy: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            library_root: PathBuf::from(DEFAULT_LIBRARY),
            sources_file: PathBuf::from(DEFAULT_SOURCES),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            request_delay_ms: DEFAULT_DELAY_MS,
            delay_jitter_ms: DEFAULT_JITTER_MS,
            proxy: None,
        }
    }
}

/// Settings file shape; every field optional so partial files work.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    database: Option<String>,
    library: Option<String>,
    sources: Option<String>,
    request_timeout_secs: Option<u64>,
    request_delay_ms: Option<u64>,
    delay_jitter_ms: Option<u64>,
    proxy: Option<String>,
}

impl Settings {
    /// Load settings.
    ///
    /// Layering, lowest to highest: built-in defaults, the TOML file (when
    /// given or when `periodica.toml` exists in the working directory),
    /// then `PERIODICA_DB` / `PERIODICA_LIBRARY` / `PERIODICA_PROXY`
    /// environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = PathBuf::from("periodica.toml");
                default.exists().then_some(default)
            }
        };
        if let Some(path) = path {
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let file: SettingsFile =
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            settings.apply_file(file, &base_dir);
            debug!("Loaded settings from {}", path.display());
        }

        if let Some(db) = env_path("PERIODICA_DB") {
            settings.database_path = db;
        }
        if let Some(library) = env_path("PERIODICA_LIBRARY") {
            settings.library_root = library;
        }
        if let Some(proxy) = std::env::var("PERIODICA_PROXY")
            .ok()
            .filter(|s| !s.is_empty())
        {
            settings.proxy = Some(proxy);
        }
        Ok(settings)
    }

    fn apply_file(&mut self, file: SettingsFile, base_dir: &Path) {
        if let Some(database) = file.database {
            self.database_path = resolve_path(&database, base_dir);
        }
        if let Some(library) = file.library {
            self.library_root = resolve_path(&library, base_dir);
        }
        if let Some(sources) = file.sources {
            self.sources_file = resolve_path(&sources, base_dir);
        }
        if let Some(timeout) = file.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(delay) = file.request_delay_ms {
            self.request_delay_ms = delay;
        }
        if let Some(jitter) = file.delay_jitter_ms {
            self.delay_jitter_ms = jitter;
        }
        if let Some(proxy) = file.proxy {
            self.proxy = Some(proxy);
        }
    }
}

/// Source catalog file shape.
#[derive(Debug, Deserialize)]
struct SourceCatalog {
    #[serde(default)]
    scrapers: Vec<ScraperSpec>,
}

/// Load every scraper spec from the source catalog.
pub fn load_sources(path: &Path) -> Result<Vec<ScraperSpec>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog: SourceCatalog = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(catalog.scrapers)
}

/// Expand `~` and resolve relative paths against the settings file's
/// directory.
fn resolve_path(raw: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|raw| PathBuf::from(shellexpand::tilde(&raw).as_ref()))
}

/// Starter settings file written by `init`.
pub const EXAMPLE_SETTINGS: &str = r#"# Periodica settings. Relative paths resolve against this file's directory.

database = "periodica.db"
library = "library"
sources = "sources.toml"

request_timeout_secs = 30
request_delay_ms = 500
delay_jitter_ms = 250

# proxy = "socks5://127.0.0.1:9050"
"#;

/// Starter source catalog written by `init`.
pub const EXAMPLE_SOURCES: &str = r#"# Source catalog. One [[scrapers]] block per publisher; each block lists
# the sources harvested under that scraper's name.

[[scrapers]]
name = "example"

[[scrapers.sources]]
id = "journal-of-examples"
base_url = "https://example.org/joe"
strategy = "volume"
volumes = { start = 1, end = 10 }
issues = { start = 1, end = 12 }

[scrapers.sources.config]
issue_url = "{base}/vol/{volume}/issue/{issue}"

[[scrapers.sources]]
id = "annual-report"
base_url = "https://example.org/reports"
strategy = "direct"

[scrapers.sources.config]
urls = ["https://example.org/reports/2024.pdf"]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.library_root, PathBuf::from(DEFAULT_LIBRARY));
    }

    #[test]
    fn test_relative_paths_resolve_against_file_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("periodica.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "database = \"data/meta.db\"").unwrap();
        writeln!(file, "library = \"/var/lib/periodica\"").unwrap();
        writeln!(file, "request_delay_ms = 100").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.database_path, dir.path().join("data/meta.db"));
        assert_eq!(settings.library_root, PathBuf::from("/var/lib/periodica"));
        assert_eq!(settings.request_delay_ms, 100);
        assert_eq!(settings.delay_jitter_ms, DEFAULT_JITTER_MS);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "database = [not toml").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_example_settings_parse() {
        let file: SettingsFile = toml::from_str(EXAMPLE_SETTINGS).unwrap();
        assert_eq!(file.database.as_deref(), Some("periodica.db"));
        assert_eq!(file.request_delay_ms, Some(500));
        assert!(file.proxy.is_none());
    }

    #[test]
    fn test_example_catalog_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sources.toml");
        fs::write(&path, EXAMPLE_SOURCES).unwrap();
        let scrapers = load_sources(&path).unwrap();
        assert_eq!(scrapers.len(), 1);
        assert_eq!(scrapers[0].name, "example");
        assert_eq!(scrapers[0].sources.len(), 2);
        assert_eq!(scrapers[0].sources[0].strategy, "volume");
        assert_eq!(
            scrapers[0].sources[0].volumes,
            Some(crate::models::NumericRange::new(1, 10))
        );
    }
}
