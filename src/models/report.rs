use std::fmt;

use serde::{Deserialize, Serialize};

/// One report returned by the extraction step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReport {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub url: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter: Option<u8>,
}

impl ExtractedReport {
    /// One line of the extracted-report dump
    pub fn to_line(&self) -> String {
        format!(
            "Report(title='{}', category='{}', url='{}', year={}, quarter={})",
            self.title,
            self.category,
            self.url,
            option_repr(self.year),
            option_repr(self.quarter),
        )
    }
}

fn option_repr<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

/// A report ready for download, joined with the page it was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub report: ExtractedReport,
    /// Page the link was found on, used as the Referer
    pub source_url: String,
    /// Extension known from the crawl, empty if none
    pub file_extension: String,
}

impl ReportTarget {
    pub fn new(report: ExtractedReport, source_url: impl Into<String>, file_extension: impl Into<String>) -> Self {
        Self {
            report,
            source_url: source_url.into(),
            file_extension: file_extension.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.report.url
    }
}
