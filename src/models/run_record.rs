//! Durable record of one company's pipeline run

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::company::Company;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

/// A file written by the download stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub title: String,
    pub category: String,
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub url: String,
    pub file_name: String,
    pub file_path: String,
    pub size: u64,
    /// MD5 of the file contents, lowercase hex
    pub checksum: String,
    pub download_timestamp: DateTime<Local>,
    pub source_page: String,
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRun {
    pub company: String,
    pub ticker: String,
    pub ir_url: String,
    pub pipeline_start_time: DateTime<Local>,
    pub pipeline_end_time: Option<DateTime<Local>>,
    pub status: RunStatus,
    pub error_message: Option<String>,

    pub crawl_start_time: Option<DateTime<Local>>,
    pub crawl_end_time: Option<DateTime<Local>>,
    pub urls_visited: usize,
    pub documents_found: usize,
    pub max_depth: usize,

    pub extraction_start_time: Option<DateTime<Local>>,
    pub extraction_end_time: Option<DateTime<Local>>,
    pub link_dump_chars: usize,
    pub model_used: Option<String>,
    pub reports_extracted: usize,

    pub download_start_time: Option<DateTime<Local>>,
    pub download_end_time: Option<DateTime<Local>>,
    pub files_downloaded: usize,
    pub files_failed: usize,
    pub downloaded_files: Vec<DownloadedFile>,
}

impl CompanyRun {
    pub fn start(company: &Company) -> Self {
        Self {
            company: company.name.clone(),
            ticker: company.ticker.clone(),
            ir_url: company.ir_url.clone(),
            pipeline_start_time: Local::now(),
            pipeline_end_time: None,
            status: RunStatus::InProgress,
            error_message: None,
            crawl_start_time: None,
            crawl_end_time: None,
            urls_visited: 0,
            documents_found: 0,
            max_depth: 0,
            extraction_start_time: None,
            extraction_end_time: None,
            link_dump_chars: 0,
            model_used: None,
            reports_extracted: 0,
            download_start_time: None,
            download_end_time: None,
            files_downloaded: 0,
            files_failed: 0,
            downloaded_files: Vec::new(),
        }
    }

    /// Set the terminal status. Returns false if it was already set.
    pub fn finish(&mut self, success: bool, error: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = if success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.error_message = error;
        self.pipeline_end_time = Some(Local::now());
        true
    }
}
