//! Batch company processor - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Initialisation**: logging, browser, collaborators, shared flow
//! 2. **Roster**: load the companies from TOML, apply the name filter
//! 3. **Concurrency**: a Semaphore caps the companies in flight
//! 4. **Resources**: sole owner of the Browser
//! 5. **Summary**: succeeded and failed companies with their first-level error

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::BrowserRenderer;
use crate::models::{loaders, Company};
use crate::orchestrator::company_processor::{process_company, CompanyResult};
use crate::services::{HttpDownloader, HttpTitleResolver, LlmReportExtractor, TitleResolver};
use crate::utils::logging;
use crate::workflow::{CompanyCtx, CompanyFlow, CompanyOutcome};

/// Application
pub struct App {
    config: Config,
    _browser: Arc<Browser>,
    flow: Arc<CompanyFlow>,
}

impl App {
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config);

        if config.llm_api_key.is_none() {
            warn!("⚠️ LLM_API_KEY is not set, extraction will fail for every company with documents");
        }

        let browser = Arc::new(browser::open_browser(&config).await?);
        let renderer = Arc::new(BrowserRenderer::new(browser.clone(), config.page_timeout()));
        let extractor = Arc::new(LlmReportExtractor::new(&config));
        let downloader = Arc::new(HttpDownloader::new(&config)?);
        let title_resolver: Option<Arc<dyn TitleResolver>> = if config.resolve_document_titles {
            Some(Arc::new(HttpTitleResolver::new(config.title_lookup_timeout())?))
        } else {
            None
        };
        let flow = Arc::new(CompanyFlow::from_config(
            &config,
            renderer,
            title_resolver,
            extractor,
            downloader,
        ));

        Ok(Self {
            config,
            _browser: browser,
            flow,
        })
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let companies = self.load_companies().await?;
        if companies.is_empty() {
            warn!("⚠️ no companies to process, exiting");
            return Ok(RunSummary::default());
        }

        let workers = self.config.worker_count(companies.len());
        logging::log_companies_loaded(companies.len(), workers);

        let summary = process_all_companies(
            self.flow.clone(),
            companies,
            workers,
            PathBuf::from(&self.config.metadata_dir),
        )
        .await?;

        logging::print_final_summary(&summary, &self.config);
        if let Err(e) = logging::append_summary(&self.config.output_log_file, &summary, &self.config.metadata_dir) {
            error!("could not append summary to {}: {:#}", self.config.output_log_file, e);
        }
        Ok(summary)
    }

    async fn load_companies(&self) -> Result<Vec<Company>> {
        info!("\n📁 loading companies from {}", self.config.companies_file);
        let companies = loaders::load_roster(Path::new(&self.config.companies_file)).await?;
        let total = companies.len();
        let companies = loaders::filter_roster(companies, &self.config.company_filter);
        if companies.len() != total {
            info!(
                "🔎 company filter {:?} keeps {}/{}",
                self.config.company_filter,
                companies.len(),
                total
            );
        }
        Ok(companies)
    }
}

/// Process every company with at most `workers` in flight.
///
/// One company's failure never affects another; every company yields
/// exactly one result.
pub async fn process_all_companies(
    flow: Arc<CompanyFlow>,
    companies: Vec<Company>,
    workers: usize,
    metadata_dir: PathBuf,
) -> Result<RunSummary> {
    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let metadata_dir = Arc::new(metadata_dir);
    let total = companies.len();
    let mut handles = Vec::with_capacity(total);

    for (idx, company) in companies.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let ctx = CompanyCtx::new(company, idx + 1, total);
        let name = ctx.company.name.clone();
        let flow = flow.clone();
        let metadata_dir = metadata_dir.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            process_company(&flow, ctx, &metadata_dir).await
        });
        handles.push((name, handle));
    }

    let mut results = Vec::with_capacity(total);
    for (name, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("[{}] task failed to complete: {}", name, e);
                results.push(CompanyResult {
                    company: name,
                    success: false,
                    error: Some(format!("task failed to complete: {}", e)),
                    outcome: CompanyOutcome::default(),
                    metadata_path: None,
                });
            }
        }
    }

    Ok(RunSummary {
        elapsed: started.elapsed(),
        results,
    })
}

/// Results of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub results: Vec<CompanyResult>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &CompanyResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CompanyResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn result_for(&self, company: &str) -> Option<&CompanyResult> {
        self.results.iter().find(|r| r.company == company)
    }

    pub fn documents_found(&self) -> usize {
        self.results.iter().map(|r| r.outcome.documents_found).sum()
    }

    pub fn reports_extracted(&self) -> usize {
        self.results.iter().map(|r| r.outcome.reports_extracted).sum()
    }

    pub fn files_downloaded(&self) -> usize {
        self.results.iter().map(|r| r.outcome.files_downloaded).sum()
    }

    pub fn files_failed(&self) -> usize {
        self.results.iter().map(|r| r.outcome.files_failed).sum()
    }
}
