//! Company processing flow - workflow layer
//!
//! Defines the full run for one company:
//! 1. crawl the IR site, dump the relevant links
//! 2. read the dump back, extract the latest quarter's reports
//! 3. download every extracted report
//!
//! Stages run strictly in order; the first failing stage ends the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, Stage};
use crate::infrastructure::{MinIntervalGate, PageRenderer, RandomDelay};
use crate::models::document_link::file_extension_of;
use crate::models::{DocumentLink, ExtractedReport, LinkSet, ReportTarget};
use crate::services::{
    ArtifactWriter, CrawlSettings, FileDownloader, PeriodExtractor, ReportExtractor,
    RunMetadataRecorder, SiteCrawler, TitleResolver,
};
use crate::workflow::company_ctx::CompanyCtx;

/// Counts of a finished company run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanyOutcome {
    pub pages_visited: usize,
    pub documents_found: usize,
    pub reports_extracted: usize,
    pub files_downloaded: usize,
    pub files_failed: usize,
}

/// Company flow
///
/// - owns no per-company state, one instance serves every task
/// - only depends on capabilities (services) and shared infrastructure
pub struct CompanyFlow {
    crawler: SiteCrawler,
    extractor: Arc<dyn ReportExtractor>,
    downloader: Arc<dyn FileDownloader>,
    artifacts: ArtifactWriter,
    extraction_gate: Arc<MinIntervalGate>,
    downloads_dir: PathBuf,
    download_delay: RandomDelay,
}

impl CompanyFlow {
    pub fn new(
        crawler: SiteCrawler,
        extractor: Arc<dyn ReportExtractor>,
        downloader: Arc<dyn FileDownloader>,
        artifacts: ArtifactWriter,
        extraction_gate: Arc<MinIntervalGate>,
        downloads_dir: impl Into<PathBuf>,
        download_delay: RandomDelay,
    ) -> Self {
        Self {
            crawler,
            extractor,
            downloader,
            artifacts,
            extraction_gate,
            downloads_dir: downloads_dir.into(),
            download_delay,
        }
    }

    /// Wire a flow from configuration and its collaborators
    pub fn from_config(
        config: &Config,
        renderer: Arc<dyn PageRenderer>,
        title_resolver: Option<Arc<dyn TitleResolver>>,
        extractor: Arc<dyn ReportExtractor>,
        downloader: Arc<dyn FileDownloader>,
    ) -> Self {
        let mut crawler = SiteCrawler::new(
            renderer,
            Arc::new(CrawlSettings::from_config(config)),
            PeriodExtractor::for_today(),
        );
        if let Some(resolver) = title_resolver {
            crawler = crawler.with_title_resolver(resolver);
        }
        Self::new(
            crawler,
            extractor,
            downloader,
            ArtifactWriter::new(&config.ir_links_dir, &config.extracted_reports_dir),
            Arc::new(MinIntervalGate::new(config.extraction_min_interval())),
            &config.downloads_dir,
            config.download_delay(),
        )
    }

    pub async fn run(&self, ctx: &CompanyCtx, recorder: &mut RunMetadataRecorder) -> AppResult<CompanyOutcome> {
        let mut outcome = CompanyOutcome::default();

        // ========== Stage 1: crawl ==========
        let documents = self.crawl(ctx, recorder, &mut outcome).await?;
        if documents.is_empty() {
            warn!("{} ⚠️ no relevant documents found, skipping extraction and download", ctx);
            return Ok(outcome);
        }

        // ========== Stage 2: extraction ==========
        let reports = self.extract(ctx, recorder).await?;
        outcome.reports_extracted = reports.len();
        if reports.is_empty() {
            warn!("{} ⚠️ no reports extracted, nothing to download", ctx);
            return Ok(outcome);
        }

        // ========== Stage 3: download ==========
        let targets = join_with_links(reports, &documents, &ctx.company.ir_url);
        self.download(ctx, recorder, &targets, &mut outcome).await?;

        info!(
            "{} ✅ done: {} document(s), {} report(s), {} file(s) downloaded, {} failed",
            ctx,
            outcome.documents_found,
            outcome.reports_extracted,
            outcome.files_downloaded,
            outcome.files_failed
        );
        Ok(outcome)
    }

    async fn crawl(
        &self,
        ctx: &CompanyCtx,
        recorder: &mut RunMetadataRecorder,
        outcome: &mut CompanyOutcome,
    ) -> AppResult<Vec<DocumentLink>> {
        info!("{} 🕷️ crawling {}", ctx, ctx.company.ir_url);
        recorder.start_crawl(self.crawler.settings().max_depth);

        let crawl = self
            .crawler
            .crawl(&ctx.label(), &ctx.company.ir_url)
            .await
            .map_err(|e| stage_error(Stage::Crawl, e))?;

        recorder.complete_crawl(crawl.pages_visited, crawl.documents.len());
        outcome.pages_visited = crawl.pages_visited;
        outcome.documents_found = crawl.documents.len();

        self.artifacts
            .write_link_dump(ctx.name(), &crawl.documents)
            .await
            .map_err(|e| stage_error(Stage::Crawl, e))?;

        info!(
            "{} ✓ {} document(s) for {} from {} page(s)",
            ctx,
            crawl.documents.len(),
            crawl.latest_period,
            crawl.pages_visited
        );
        Ok(crawl.documents)
    }

    async fn extract(&self, ctx: &CompanyCtx, recorder: &mut RunMetadataRecorder) -> AppResult<Vec<ExtractedReport>> {
        let dump = self
            .artifacts
            .read_link_dump(ctx.name())
            .await
            .map_err(|e| stage_error(Stage::Extraction, e))?;
        recorder.start_extraction(dump.chars().count(), self.extractor.model_name());

        info!(
            "{} 🤖 extracting reports with {} ({} chars)",
            ctx,
            self.extractor.model_name(),
            dump.len()
        );
        debug!(
            "{} ⏳ waiting for an extraction slot (min spacing {:?})",
            ctx,
            self.extraction_gate.interval()
        );
        self.extraction_gate.wait().await;

        let reports = self
            .extractor
            .extract(&dump)
            .await
            .map_err(|e| stage_error(Stage::Extraction, e))?;

        self.artifacts
            .write_report_dump(ctx.name(), &reports)
            .await
            .map_err(|e| stage_error(Stage::Extraction, e))?;
        recorder.complete_extraction(reports.len());

        info!("{} ✓ {} report(s) extracted", ctx, reports.len());
        Ok(reports)
    }

    async fn download(
        &self,
        ctx: &CompanyCtx,
        recorder: &mut RunMetadataRecorder,
        targets: &[ReportTarget],
        outcome: &mut CompanyOutcome,
    ) -> AppResult<()> {
        recorder.start_download();
        let dest_dir = self.downloads_dir.join(ctx.company.file_stem());
        ensure_dir(&dest_dir).await?;

        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                self.download_delay.pause().await;
            }
            info!("{} ⬇️ [{}/{}] {}", ctx, index + 1, targets.len(), target.url());

            match self.downloader.download(target, &dest_dir).await {
                Ok(file) => {
                    outcome.files_downloaded += 1;
                    recorder.record_download(file);
                }
                Err(e) => {
                    warn!("{} ⚠️ download failed for {}: {:#}", ctx, target.url(), e);
                    outcome.files_failed += 1;
                    recorder.record_download_failure();
                }
            }
        }

        recorder.complete_download();
        Ok(())
    }
}

async fn ensure_dir(dir: &Path) -> AppResult<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        stage_error(
            Stage::Download,
            anyhow::Error::new(e).context(format!("creating {}", dir.display())),
        )
    })
}

/// Keep precondition failures as they are, wrap everything else in the stage
fn stage_error(stage: Stage, error: anyhow::Error) -> AppError {
    match error.downcast::<AppError>() {
        Ok(AppError::Precondition(message)) => AppError::Precondition(message),
        Ok(other) => AppError::stage(stage, anyhow::Error::new(other)),
        Err(error) => AppError::stage(stage, error),
    }
}

/// Attach the crawl's link metadata to each extracted report, matched by URL
pub fn join_with_links(reports: Vec<ExtractedReport>, documents: &[DocumentLink], fallback_source: &str) -> Vec<ReportTarget> {
    let mut known = LinkSet::new();
    known.extend(documents.iter().cloned());

    reports
        .into_iter()
        .map(|report| match known.get(&report.url) {
            Some(link) => {
                let source = link.source_url.clone();
                let extension = link.file_extension.clone();
                ReportTarget::new(report, source, extension)
            }
            None => {
                let extension = file_extension_of(&report.url);
                ReportTarget::new(report, fallback_source, extension)
            }
        })
        .collect()
}
