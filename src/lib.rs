//! # IR Quarterly Reports
//!
//! Finds, extracts and downloads the latest quarterly financial documents
//! from company investor-relations websites, many companies at a time.
//!
//! ## Architecture
//!
//! Four layers, each depending only on the ones below it:
//!
//! ### ① Infrastructure
//! - `infrastructure/` - scarce or shared resources, exposed as capabilities
//! - `PageRenderer` / `BrowserRenderer` - URL in, anchors of the rendered page out
//! - `RetryPolicy`, `RandomDelay`, `MinIntervalGate` - backoff, politeness, rate limiting
//!
//! ### ② Services
//! - `services/` - what we can do for one site or one file
//! - `link_classifier`, `period_extractor`, `relevance_filter` - pure link logic
//! - `SiteCrawler` - bounded breadth-first crawl of one IR site
//! - `ReportExtractor`, `FileDownloader` - extraction and download collaborators
//! - `ArtifactWriter`, `RunMetadataRecorder` - per-company files and run records
//!
//! ### ③ Workflow
//! - `workflow/` - the full run of one company
//! - `CompanyCtx` - which company, where in the roster
//! - `CompanyFlow` - crawl → extraction → download
//!
//! ### ④ Orchestration
//! - `orchestrator/batch_processor` - roster, worker pool, final summary
//! - `orchestrator/company_processor` - task boundary and the run record

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult, Stage};
pub use models::{Company, CompanyRun, DocumentLink, FiscalPeriod, LinkType, RunStatus};
pub use orchestrator::{process_all_companies, App, RunSummary};
pub use services::{CrawlSettings, PeriodExtractor, SiteCrawler};
pub use workflow::{CompanyCtx, CompanyFlow};
