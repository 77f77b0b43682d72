//! End-to-end pipeline tests against the public API: harvest a stub site,
//! ingest its documents, repair a failed issue, and check the analytics
//! funnel over the same database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use periodica::fetch::{FetchError, FetchOptions, Fetcher};
use periodica::models::{NumericRange, ScrapeOutput, ScraperSpec, SourceConfig, SourceSpec};
use periodica::repository::{FailureLedger, OutputRepository, ResourceRepository, Store};
use periodica::services::{AnalyticsService, HarvestService, RepairService};
use periodica::storage::{FsObjectStore, ObjectStore};
use tempfile::TempDir;

/// Canned-response fetcher; unknown URLs fail with status 404.
#[derive(Default)]
struct SiteFetcher {
    pages: Mutex<HashMap<String, Vec<u8>>>,
}

impl SiteFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }
}

#[async_trait]
impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<Vec<u8>, FetchError> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

fn issue_page(links: &[&str]) -> String {
    let anchors: Vec<String> = links
        .iter()
        .map(|l| format!("<a href=\"{}\">doc</a>", l))
        .collect();
    format!("<html><body>{}</body></html>", anchors.join(""))
}

fn journal_source() -> SourceSpec {
    SourceSpec {
        id: "annals".to_string(),
        base_url: "https://pub.example/annals".to_string(),
        strategy: "volume".to_string(),
        volumes: Some(NumericRange::new(1, 2)),
        issues: Some(NumericRange::new(1, 2)),
        miss_threshold: 3,
        config: SourceConfig {
            issue_url: Some("{base}/vol/{volume}/issue/{issue}".to_string()),
            ..SourceConfig::default()
        },
    }
}

fn scraper() -> ScraperSpec {
    ScraperSpec {
        name: "pub".to_string(),
        sources: vec![journal_source()],
    }
}

struct Pipeline {
    _library: TempDir,
    store: Store,
    fetcher: Arc<SiteFetcher>,
    harvest: HarvestService,
    repair: RepairService,
    library_root: std::path::PathBuf,
}

fn pipeline(fetcher: SiteFetcher) -> Pipeline {
    let library = TempDir::new().unwrap();
    let library_root = library.path().to_path_buf();
    let store = Store::open_in_memory().unwrap();
    let fetcher = Arc::new(fetcher);
    let objects = Arc::new(FsObjectStore::new(&library_root));
    let harvest = HarvestService::new(store.clone(), fetcher.clone(), objects.clone());
    let repair = RepairService::new(store.clone(), fetcher.clone(), objects);
    Pipeline {
        _library: library,
        store,
        fetcher,
        harvest,
        repair,
        library_root,
    }
}

#[tokio::test]
async fn harvest_ingest_and_analytics_funnel() {
    let fetcher = SiteFetcher::new();
    fetcher.serve(
        "https://pub.example/annals/vol/1/issue/1",
        issue_page(&["https://pub.example/annals/d1.pdf"]),
    );
    fetcher.serve(
        "https://pub.example/annals/vol/1/issue/2",
        issue_page(&["https://pub.example/annals/d2.pdf"]),
    );
    fetcher.serve(
        "https://pub.example/annals/vol/2/issue/1",
        issue_page(&["https://pub.example/annals/d3.pdf"]),
    );
    fetcher.serve("https://pub.example/annals/d1.pdf", b"doc one".to_vec());
    fetcher.serve("https://pub.example/annals/d2.pdf", b"doc two".to_vec());
    // d3.pdf is not served; its retrieval fails.

    let p = pipeline(fetcher);
    let summary = p.harvest.run(&[scraper()], true).await;
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.links, 3);
    assert_eq!(summary.upload.retrieved, 2);
    assert_eq!(summary.upload.uploaded, 2);
    assert_eq!(summary.upload.failed, 1);

    // The output record holds the volume/issue hierarchy.
    let tree = OutputRepository::new(p.store.clone())
        .load("pub")
        .unwrap()
        .unwrap();
    match &tree["annals"] {
        ScrapeOutput::Volumes(volumes) => {
            assert_eq!(volumes[&1][&1], vec!["https://pub.example/annals/d1.pdf"]);
            assert_eq!(volumes[&2][&1], vec!["https://pub.example/annals/d3.pdf"]);
        }
        other => panic!("expected volume hierarchy, got {:?}", other),
    }

    // Uploaded bytes are on disk under the scraper's root key.
    let resources = ResourceRepository::new(p.store.clone());
    let records = resources.for_scraper("pub").unwrap();
    let uploaded: Vec<_> = records.iter().filter(|r| r.uploaded).collect();
    assert_eq!(uploaded.len(), 2);
    for record in &uploaded {
        assert!(p.library_root.join(&record.dest_key).is_file());
    }

    // Analytics reflects the funnel: 3 scraped (issue 2/2 of volume 2 also
    // failed but contributes to the failure side), 2 retrieved, 2 uploaded.
    let snapshot = AnalyticsService::new(p.store.clone())
        .snapshot("pub")
        .unwrap();
    assert_eq!(snapshot.scraped.success_count, 3);
    assert!(snapshot.scraped.failure_count >= 1);
    assert_eq!(snapshot.content_retrieved.success_count, 2);
    assert_eq!(snapshot.content_retrieved.failure_count, 1);
    assert_eq!(snapshot.uploaded.success_count, 2);
    assert_eq!(snapshot.uploaded.ratio, 1.0);
}

#[tokio::test]
async fn identical_documents_share_one_object() {
    let fetcher = SiteFetcher::new();
    fetcher.serve(
        "https://pub.example/annals/vol/1/issue/1",
        issue_page(&[
            "https://pub.example/annals/d1.pdf",
            "https://pub.example/annals/mirror/d1.pdf",
        ]),
    );
    fetcher.serve("https://pub.example/annals/d1.pdf", b"same bytes".to_vec());
    fetcher.serve(
        "https://pub.example/annals/mirror/d1.pdf",
        b"same bytes".to_vec(),
    );

    let mut source = journal_source();
    source.volumes = Some(NumericRange::new(1, 1));
    source.issues = Some(NumericRange::new(1, 1));
    let spec = ScraperSpec {
        name: "pub".to_string(),
        sources: vec![source],
    };

    let p = pipeline(fetcher);
    p.harvest.run(&[spec], true).await;

    let records = ResourceRepository::new(p.store.clone())
        .for_scraper("pub")
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].dest_key, records[1].dest_key);
    assert_eq!(records[0].content_hash, records[1].content_hash);

    // One object on disk, not two.
    let key = &records[0].dest_key;
    assert!(p.library_root.join(key).is_file());
    let objects = FsObjectStore::new(&p.library_root);
    assert_eq!(objects.get(key).unwrap(), b"same bytes");
}

#[tokio::test]
async fn retry_recovers_issue_that_came_back_online() {
    let fetcher = SiteFetcher::new();
    fetcher.serve(
        "https://pub.example/annals/vol/1/issue/1",
        issue_page(&["https://pub.example/annals/d1.pdf"]),
    );
    // Issues 1/2, 2/1 and 2/2 are down during the harvest.

    let p = pipeline(fetcher);
    p.harvest.run(&[scraper()], false).await;

    let ledger = FailureLedger::new(p.store.clone());
    let failed_units: Vec<String> = ledger
        .latest_failures("pub")
        .unwrap()
        .into_iter()
        .map(|f| f.source)
        .collect();
    assert!(failed_units.contains(&"https://pub.example/annals/vol/1/issue/2".to_string()));

    // The issue comes back; retry re-fetches only failed units.
    p.fetcher.serve(
        "https://pub.example/annals/vol/1/issue/2",
        issue_page(&["https://pub.example/annals/d9.pdf"]),
    );
    let summary = p.repair.run(&scraper(), false).await.unwrap();
    assert_eq!(summary.repaired, 1);
    assert_eq!(summary.links, 1);

    let tree = OutputRepository::new(p.store.clone())
        .load("pub")
        .unwrap()
        .unwrap();
    match &tree["annals"] {
        ScrapeOutput::Volumes(volumes) => {
            assert_eq!(volumes[&1][&2], vec!["https://pub.example/annals/d9.pdf"]);
            // The originally harvested issue is still there.
            assert_eq!(volumes[&1][&1], vec!["https://pub.example/annals/d1.pdf"]);
        }
        other => panic!("expected volume hierarchy, got {:?}", other),
    }

    // Ledger history is append-only; the repair does not erase it.
    assert!(!ledger.all("pub").unwrap().is_empty());
}
