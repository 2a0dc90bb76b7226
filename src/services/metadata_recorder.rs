//! Run metadata recorder
//!
//! Observes one company run and writes its record exactly once. Recording
//! problems are logged and swallowed; they never fail the pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::models::company::sanitize_file_name;
use crate::models::{Company, CompanyRun, DownloadedFile, RunStatus};

const MAX_NAME_COLLISIONS: u32 = 100;

#[derive(Debug)]
pub struct RunMetadataRecorder {
    run: CompanyRun,
    metadata_dir: PathBuf,
    persisted: Option<PathBuf>,
}

impl RunMetadataRecorder {
    pub fn new(company: &Company, metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            run: CompanyRun::start(company),
            metadata_dir: metadata_dir.into(),
            persisted: None,
        }
    }

    pub fn run(&self) -> &CompanyRun {
        &self.run
    }

    // ========== Crawl ==========

    pub fn start_crawl(&mut self, max_depth: usize) {
        self.run.crawl_start_time = Some(Local::now());
        self.run.max_depth = max_depth;
    }

    pub fn complete_crawl(&mut self, urls_visited: usize, documents_found: usize) {
        self.run.crawl_end_time = Some(Local::now());
        self.run.urls_visited = urls_visited;
        self.run.documents_found = documents_found;
    }

    // ========== Extraction ==========

    pub fn start_extraction(&mut self, link_dump_chars: usize, model: &str) {
        self.run.extraction_start_time = Some(Local::now());
        self.run.link_dump_chars = link_dump_chars;
        self.run.model_used = Some(model.to_string());
    }

    pub fn complete_extraction(&mut self, reports_extracted: usize) {
        self.run.extraction_end_time = Some(Local::now());
        self.run.reports_extracted = reports_extracted;
    }

    // ========== Download ==========

    pub fn start_download(&mut self) {
        self.run.download_start_time = Some(Local::now());
    }

    pub fn record_download(&mut self, file: DownloadedFile) {
        self.run.files_downloaded += 1;
        self.run.downloaded_files.push(file);
    }

    pub fn record_download_failure(&mut self) {
        self.run.files_failed += 1;
    }

    pub fn complete_download(&mut self) {
        self.run.download_end_time = Some(Local::now());
    }

    // ========== Terminal ==========

    /// Set the terminal status and persist the record.
    ///
    /// Only the first call has any effect. Returns the record's path when it
    /// was written.
    pub async fn complete(&mut self, success: bool, error: Option<String>) -> Option<PathBuf> {
        if self.persisted.is_some() || self.run.status.is_terminal() {
            debug!("metadata for {} already completed", self.run.company);
            return self.persisted.clone();
        }
        self.run.finish(success, error);

        match write_record(&self.metadata_dir, &self.run).await {
            Ok(path) => {
                info!("📝 metadata for {} saved to {}", self.run.company, path.display());
                self.persisted = Some(path.clone());
                Some(path)
            }
            Err(e) => {
                error!("❌ could not save metadata for {}: {:#}", self.run.company, e);
                None
            }
        }
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }
}

/// Write `run` to a new file; existing records are never overwritten
async fn write_record(dir: &Path, run: &CompanyRun) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let json = serde_json::to_string_pretty(run).context("serializing run metadata")?;
    let stem = format!(
        "metadata_{}_{}",
        sanitize_file_name(&run.company).replace(' ', "_"),
        Local::now().format("%Y%m%d_%H%M%S")
    );

    for attempt in 0..MAX_NAME_COLLISIONS {
        let file_name = if attempt == 0 {
            format!("{}.json", stem)
        } else {
            format!("{}_{}.json", stem, attempt)
        };
        let path = dir.join(file_name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(json.as_bytes())
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e).with_context(|| format!("creating {}", path.display())),
        }
    }

    anyhow::bail!("no free metadata file name for {}", stem)
}
