//! CLI parser and command dispatch.

mod analytics;
mod failures;
mod harvest;
mod ingest;
mod init;
mod retry;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use crate::config::{self, Settings};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::models::ScraperSpec;
use crate::repository::Store;
use crate::storage::{FsObjectStore, ObjectStore};

#[derive(Parser)]
#[command(name = "periodica")]
#[command(about = "Resumable document harvesting from periodical sites")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./periodica.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database, library directory, and a starter source catalog
    Init,

    /// Scrape configured scrapers and persist their output records
    Harvest {
        /// Scraper names to harvest (all configured scrapers if omitted)
        scrapers: Vec<String>,
        /// Scrape only; skip content retrieval and upload
        #[arg(long)]
        no_upload: bool,
    },

    /// Re-fetch previously failed units without re-walking their sources
    Retry {
        /// Scraper names to retry (all configured scrapers if omitted)
        scrapers: Vec<String>,
        /// Also retrieve and upload content recovered by the repair
        #[arg(short, long)]
        upload: bool,
    },

    /// Retrieve and upload content for already-harvested links
    Ingest {
        /// Scraper names to ingest (all configured scrapers if omitted)
        scrapers: Vec<String>,
    },

    /// Show the failure ledger for a scraper
    Failures {
        /// Scraper name
        scraper: String,
        /// Show the full history instead of the newest entry per unit
        #[arg(long)]
        history: bool,
    },

    /// Compute and show pipeline analytics for a scraper
    Analytics {
        /// Scraper name
        scraper: String,
        /// Show the last persisted snapshot instead of computing a new one
        #[arg(long)]
        last: bool,
    },
}

/// Shared handles every command builds from settings.
pub(crate) struct App {
    pub settings: Settings,
    pub store: Store,
    pub fetcher: Arc<dyn Fetcher>,
    pub objects: Arc<dyn ObjectStore>,
}

impl App {
    fn open(settings: Settings) -> anyhow::Result<Self> {
        if let Some(parent) = settings.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        fs::create_dir_all(&settings.library_root)
            .with_context(|| format!("creating {}", settings.library_root.display()))?;

        let store = Store::open(&settings.database_path)
            .with_context(|| format!("opening {}", settings.database_path.display()))?;
        let fetcher = HttpFetcher::new(
            Duration::from_secs(settings.request_timeout_secs),
            Duration::from_millis(settings.request_delay_ms),
            settings.delay_jitter_ms,
            settings.proxy.as_deref(),
        )?;
        let objects = Arc::new(FsObjectStore::new(&settings.library_root));
        Ok(Self {
            settings,
            store,
            fetcher: Arc::new(fetcher),
            objects,
        })
    }

    /// Load the source catalog, optionally restricted to named scrapers.
    pub fn load_scrapers(&self, names: &[String]) -> anyhow::Result<Vec<ScraperSpec>> {
        let all = config::load_sources(&self.settings.sources_file)?;
        if names.is_empty() {
            return Ok(all);
        }
        let mut selected = Vec::new();
        for name in names {
            match all.iter().find(|s| &s.name == name) {
                Some(spec) => selected.push(spec.clone()),
                None => anyhow::bail!("no scraper named {:?} in the source catalog", name),
            }
        }
        Ok(selected)
    }
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings),
        Commands::Harvest { scrapers, no_upload } => {
            let app = App::open(settings)?;
            harvest::cmd_harvest(&app, &scrapers, !no_upload).await
        }
        Commands::Retry { scrapers, upload } => {
            let app = App::open(settings)?;
            retry::cmd_retry(&app, &scrapers, upload).await
        }
        Commands::Ingest { scrapers } => {
            let app = App::open(settings)?;
            ingest::cmd_ingest(&app, &scrapers).await
        }
        Commands::Failures { scraper, history } => {
            let app = App::open(settings)?;
            failures::cmd_failures(&app, &scraper, history)
        }
        Commands::Analytics { scraper, last } => {
            let app = App::open(settings)?;
            analytics::cmd_analytics(&app, &scraper, last)
        }
    }
}
