use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Local;

use ir_quarterly_reports::infrastructure::{MinIntervalGate, PageRenderer, RandomDelay, RawAnchor, RenderedPage};
use ir_quarterly_reports::models::{Company, CompanyRun, DownloadedFile, ExtractedReport, ReportTarget, RunStatus};
use ir_quarterly_reports::orchestrator::{process_all_companies, RunSummary};
use ir_quarterly_reports::services::{
    ArtifactWriter, CrawlSettings, FileDownloader, LlmReportExtractor, PeriodExtractor, ReportExtractor, SiteCrawler,
};
use ir_quarterly_reports::workflow::CompanyFlow;
use ir_quarterly_reports::Config;

// ========== Fakes ==========

#[derive(Default)]
struct FakeRenderer {
    pages: HashMap<String, Vec<RawAnchor>>,
}

impl FakeRenderer {
    fn page(mut self, url: &str, anchors: Vec<RawAnchor>) -> Self {
        self.pages.insert(url.to_string(), anchors);
        self
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        match self.pages.get(url) {
            Some(anchors) => Ok(RenderedPage {
                url: url.to_string(),
                anchors: anchors.clone(),
            }),
            None => bail!("net::ERR_NAME_NOT_RESOLVED at {}", url),
        }
    }
}

/// Returns one report per dumped URL; panics on demand
#[derive(Default)]
struct FakeExtractor {
    calls: Mutex<Vec<Instant>>,
}

impl FakeExtractor {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReportExtractor for FakeExtractor {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn extract(&self, link_dump: &str) -> Result<Vec<ExtractedReport>> {
        self.calls.lock().unwrap().push(Instant::now());
        if link_dump.contains("panic.example.com") {
            panic!("extractor blew up");
        }
        Ok(link_dump
            .lines()
            .filter_map(|line| {
                let start = line.find("url='")? + "url='".len();
                let end = start + line[start..].find('\'')?;
                Some(ExtractedReport {
                    title: "Q3 2025 Results".to_string(),
                    category: "earnings_release".to_string(),
                    url: line[start..end].to_string(),
                    year: Some(2025),
                    quarter: Some(3),
                })
            })
            .collect())
    }
}

/// Writes a small file per target; URLs containing "broken" fail
#[derive(Default)]
struct FakeDownloader {
    downloads: AtomicUsize,
}

#[async_trait]
impl FileDownloader for FakeDownloader {
    async fn download(&self, target: &ReportTarget, dest_dir: &Path) -> Result<DownloadedFile> {
        if target.url().contains("broken") {
            bail!("HTTP status server error (500 Internal Server Error)");
        }
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let bytes = b"%PDF-1.7 fake";
        let file_name = format!("report_{}.pdf", self.downloads.load(Ordering::SeqCst));
        let path = dest_dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        Ok(DownloadedFile {
            title: target.report.title.clone(),
            category: target.report.category.clone(),
            year: target.report.year,
            quarter: target.report.quarter,
            url: target.url().to_string(),
            file_name,
            file_path: path.display().to_string(),
            size: bytes.len() as u64,
            checksum: format!("{:x}", md5::compute(bytes)),
            download_timestamp: Local::now(),
            source_page: target.source_url.clone(),
            file_type: "pdf".to_string(),
        })
    }
}

// ========== Harness ==========

struct Harness {
    dir: tempfile::TempDir,
    extractor: Arc<FakeExtractor>,
    flow: Arc<CompanyFlow>,
}

impl Harness {
    fn new(renderer: FakeRenderer) -> Self {
        Self::with(renderer, None, Duration::ZERO)
    }

    fn with(renderer: FakeRenderer, extractor: Option<Arc<dyn ReportExtractor>>, gate: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fake_extractor = Arc::new(FakeExtractor::default());
        let extractor: Arc<dyn ReportExtractor> = extractor.unwrap_or_else(|| fake_extractor.clone() as Arc<dyn ReportExtractor>);

        let crawler = SiteCrawler::new(
            Arc::new(renderer),
            Arc::new(CrawlSettings::default()),
            PeriodExtractor::new(2025),
        );
        let flow = CompanyFlow::new(
            crawler,
            extractor,
            Arc::new(FakeDownloader::default()),
            ArtifactWriter::new(dir.path().join("ir_links"), dir.path().join("extracted_reports")),
            Arc::new(MinIntervalGate::new(gate)),
            dir.path().join("downloads"),
            RandomDelay::none(),
        );

        Self {
            dir,
            extractor: fake_extractor,
            flow: Arc::new(flow),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    async fn run(&self, companies: Vec<Company>, workers: usize) -> RunSummary {
        let summary = process_all_companies(self.flow.clone(), companies, workers, self.path("metadata")).await;
        tokio_test::assert_ok!(summary)
    }

    fn records(&self) -> Vec<CompanyRun> {
        std::fs::read_dir(self.path("metadata"))
            .unwrap()
            .map(|entry| {
                let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
                serde_json::from_str(&content).unwrap()
            })
            .collect()
    }

    fn record_for(&self, company: &str) -> CompanyRun {
        let mut records: Vec<_> = self.records().into_iter().filter(|r| r.company == company).collect();
        assert_eq!(records.len(), 1, "expected exactly one record for {}", company);
        records.remove(0)
    }
}

fn site(host: &str) -> (String, Vec<RawAnchor>) {
    (
        format!("https://{}/", host),
        vec![
            RawAnchor::new("/files/q3-2025-results.pdf", "Q3 2025 Results"),
            RawAnchor::new("/files/q2-2025-results.pdf", "Q2 2025 Results"),
            RawAnchor::new("/about", "About"),
        ],
    )
}

fn company(name: &str, ir_url: &str) -> Company {
    Company::new(name, name.to_uppercase(), ir_url)
}

// ========== Tests ==========

#[tokio::test]
async fn crawl_failure_is_isolated_and_recorded_once() {
    let (good_url, good_anchors) = site("good.example.com");
    let harness = Harness::new(FakeRenderer::default().page(&good_url, good_anchors));

    let summary = harness
        .run(vec![company("Broken", "not a url"), company("Good", &good_url)], 2)
        .await;

    assert_eq!(summary.total(), 2);
    let broken = summary.result_for("Broken").unwrap();
    assert!(!broken.success);
    assert!(broken.error.as_deref().unwrap().starts_with("crawl stage failed"));
    assert!(summary.result_for("Good").unwrap().success);

    assert_eq!(harness.records().len(), 2);
    let record = harness.record_for("Broken");
    assert_eq!(record.status, RunStatus::Failed);
    assert!(!record.error_message.unwrap_or_default().is_empty());

    let good = harness.record_for("Good");
    assert_eq!(good.status, RunStatus::Completed);
    assert_eq!(good.documents_found, 1);
    assert_eq!(good.reports_extracted, 1);
    assert_eq!(good.files_downloaded, 1);
    assert_eq!(good.model_used.as_deref(), Some("fake-model"));
    assert_eq!(good.downloaded_files[0].url, "https://good.example.com/files/q3-2025-results.pdf");
    assert_eq!(good.downloaded_files[0].source_page, good_url);
}

#[tokio::test]
async fn intermediate_artifacts_are_written_per_company() {
    let (url, anchors) = site("acme.example.com");
    let harness = Harness::new(FakeRenderer::default().page(&url, anchors));

    harness.run(vec![company("Acme", &url)], 1).await;

    let links = std::fs::read_to_string(harness.path("ir_links/financial_links_Acme.txt")).unwrap();
    assert_eq!(links.lines().count(), 1);
    assert!(links.contains("url='https://acme.example.com/files/q3-2025-results.pdf' type='document'"));

    let reports = std::fs::read_to_string(harness.path("extracted_reports/extracted_reports_Acme.txt")).unwrap();
    assert!(reports.starts_with("Report(title='Q3 2025 Results', category='earnings_release'"));
    assert!(harness.path("downloads/Acme/report_1.pdf").exists());
}

#[tokio::test]
async fn panic_inside_a_company_is_recorded_as_failure() {
    let (good_url, good_anchors) = site("good.example.com");
    let (panic_url, panic_anchors) = site("panic.example.com");
    let harness = Harness::new(
        FakeRenderer::default()
            .page(&good_url, good_anchors)
            .page(&panic_url, panic_anchors),
    );

    let summary = harness
        .run(vec![company("Panicky", &panic_url), company("Good", &good_url)], 2)
        .await;

    let panicky = summary.result_for("Panicky").unwrap();
    assert!(!panicky.success);
    assert!(panicky.error.as_deref().unwrap().contains("extractor blew up"));
    assert_eq!(harness.record_for("Panicky").status, RunStatus::Failed);
    assert_eq!(harness.record_for("Good").status, RunStatus::Completed);
}

#[tokio::test]
async fn missing_api_key_fails_only_that_company_as_precondition() {
    let (url, anchors) = site("acme.example.com");
    let llm: Arc<dyn ReportExtractor> = Arc::new(LlmReportExtractor::new(&Config::default()));
    let harness = Harness::with(FakeRenderer::default().page(&url, anchors), Some(llm), Duration::ZERO);

    let summary = harness.run(vec![company("Acme", &url)], 1).await;

    let result = summary.result_for("Acme").unwrap();
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().starts_with("precondition failed"));
    let record = harness.record_for("Acme");
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.documents_found, 1);
    assert!(record.extraction_end_time.is_none());
}

#[tokio::test]
async fn empty_crawl_skips_extraction_and_still_completes() {
    let url = "https://empty.example.com/";
    let harness = Harness::new(FakeRenderer::default().page(url, vec![RawAnchor::new("/about", "About")]));

    let summary = harness.run(vec![company("Empty", url)], 1).await;

    assert!(summary.result_for("Empty").unwrap().success);
    assert_eq!(harness.extractor.call_count(), 0);
    let record = harness.record_for("Empty");
    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.urls_visited, 1);
    assert_eq!(record.documents_found, 0);
    assert!(record.extraction_start_time.is_none());
}

#[tokio::test]
async fn failed_download_is_counted_without_failing_the_company() {
    let url = "https://acme.example.com/";
    let harness = Harness::new(FakeRenderer::default().page(
        url,
        vec![
            RawAnchor::new("/files/q3-2025-results.pdf", "Q3 2025 Results"),
            RawAnchor::new("/files/q3-2025-broken.pdf", "Q3 2025 Slides"),
        ],
    ));

    let summary = harness.run(vec![company("Acme", url)], 1).await;

    assert!(summary.result_for("Acme").unwrap().success);
    assert_eq!(summary.files_downloaded(), 1);
    assert_eq!(summary.files_failed(), 1);
    let record = harness.record_for("Acme");
    assert_eq!(record.files_downloaded, 1);
    assert_eq!(record.files_failed, 1);
    assert_eq!(record.downloaded_files.len(), 1);
    assert!(record.download_end_time.is_some());
}

#[tokio::test]
async fn extraction_calls_are_spaced_across_companies() {
    let mut renderer = FakeRenderer::default();
    let mut companies = Vec::new();
    for host in ["a.example.com", "b.example.com", "c.example.com"] {
        let (url, anchors) = site(host);
        renderer = renderer.page(&url, anchors);
        companies.push(company(host, &url));
    }
    let harness = Harness::with(renderer, None, Duration::from_millis(60));

    let summary = harness.run(companies, 3).await;

    assert_eq!(summary.succeeded().count(), 3);
    let mut calls = harness.extractor.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(55), "calls {:?} apart", pair[1] - pair[0]);
    }
}

#[tokio::test]
async fn single_worker_still_processes_everyone() {
    let (a_url, a_anchors) = site("a.example.com");
    let harness = Harness::new(FakeRenderer::default().page(&a_url, a_anchors));

    let companies = vec![
        company("A", &a_url),
        company("Unreachable", "https://down.example.com/"),
        company("Invalid", "ftp://files.example.com/"),
    ];
    let summary = harness.run(companies, 1).await;

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded().count(), 2);
    assert_eq!(summary.failed().count(), 1);
    assert_eq!(harness.records().len(), 3);
}

/// Needs a local Chrome; run with `cargo test -- --ignored`
#[tokio::test]
#[ignore]
async fn renders_a_real_page_in_headless_chrome() {
    use ir_quarterly_reports::browser::launch_headless_browser;
    use ir_quarterly_reports::infrastructure::BrowserRenderer;

    ir_quarterly_reports::utils::logging::init();
    let browser = Arc::new(launch_headless_browser(None).await.expect("browser should launch"));
    let renderer = BrowserRenderer::new(browser, Duration::from_secs(30));

    let page = renderer.render("https://example.com/").await.expect("page should render");

    assert!(!page.anchors.is_empty());
}
