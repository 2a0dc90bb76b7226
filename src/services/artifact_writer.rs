//! Artifact writer - business capability layer
//!
//! Only writes and reads the per-company intermediate files. Every run
//! replaces the previous files of the same company.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::AppError;
use crate::models::company::sanitize_file_name;
use crate::models::{DocumentLink, ExtractedReport};

/// One line of the link dump, every attribute as `key='value'`
pub fn link_dump_line(link: &DocumentLink) -> String {
    format!(
        "title='{}' text='{}' url='{}' type='{}' file_extension='{}' document_type='{}' source_url='{}' full_html='{}'",
        link.title,
        link.text,
        link.href,
        link.link_type,
        link.file_extension,
        link.document_type,
        link.source_url,
        single_line(&link.html),
    )
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    ir_links_dir: PathBuf,
    extracted_reports_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(ir_links_dir: impl Into<PathBuf>, extracted_reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            ir_links_dir: ir_links_dir.into(),
            extracted_reports_dir: extracted_reports_dir.into(),
        }
    }

    pub fn link_dump_path(&self, company: &str) -> PathBuf {
        self.ir_links_dir
            .join(format!("financial_links_{}.txt", sanitize_file_name(company)))
    }

    pub fn report_dump_path(&self, company: &str) -> PathBuf {
        self.extracted_reports_dir
            .join(format!("extracted_reports_{}.txt", sanitize_file_name(company)))
    }

    /// Replace the company's link dump
    pub async fn write_link_dump(&self, company: &str, links: &[DocumentLink]) -> Result<PathBuf> {
        let lines: Vec<String> = links.iter().map(link_dump_line).collect();
        let path = self.link_dump_path(company);
        write_lines(&path, &lines).await?;
        debug!("wrote {} link(s) to {}", links.len(), path.display());
        Ok(path)
    }

    /// Read the company's link dump back.
    ///
    /// A missing file is a precondition failure, not an I/O error.
    pub async fn read_link_dump(&self, company: &str) -> Result<String> {
        let path = self.link_dump_path(company);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::precondition(format!("link dump {} is missing", path.display())).into())
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Replace the company's extracted-report list
    pub async fn write_report_dump(&self, company: &str, reports: &[ExtractedReport]) -> Result<PathBuf> {
        let lines: Vec<String> = reports.iter().map(ExtractedReport::to_line).collect();
        let path = self.report_dump_path(company);
        write_lines(&path, &lines).await?;
        debug!("wrote {} report(s) to {}", reports.len(), path.display());
        Ok(path)
    }
}

async fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
