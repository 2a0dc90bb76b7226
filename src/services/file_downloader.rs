//! File download service - business capability layer
//!
//! Fetches one report over HTTP and stores it under a descriptive name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_DISPOSITION, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::browser::headless::USER_AGENT as BROWSER_USER_AGENT;
use crate::config::Config;
use crate::infrastructure::RetryPolicy;
use crate::models::company::sanitize_file_name;
use crate::models::document_link::file_extension_of;
use crate::models::{DownloadedFile, ExtractedReport, ReportTarget};

/// Download `target` into `dest_dir`
#[async_trait]
pub trait FileDownloader: Send + Sync {
    async fn download(&self, target: &ReportTarget, dest_dir: &Path) -> Result<DownloadedFile>;
}

const PRIMARY_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8";
const ALTERNATE_ACCEPT: &str = "application/pdf,application/octet-stream,*/*";

const MAX_NAME_COLLISIONS: usize = 1000;

struct Fetched {
    bytes: Vec<u8>,
    content_type: String,
    content_disposition: Option<String>,
}

pub struct HttpDownloader {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpDownloader {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.page_timeout_secs.max(1) * 4))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            retry: config.download_retry_policy(),
        })
    }

    async fn send(&self, url: &str, referer: &str, accept: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, accept)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(REFERER, referer)
            .send()
            .await
            .with_context(|| format!("requesting {}", url))
    }

    async fn fetch_once(&self, url: &str, referer: &str, expected_extension: &str) -> Result<Fetched> {
        let mut response = self.send(url, referer, PRIMARY_ACCEPT).await?;
        if needs_alternate_accept(response.status(), header_str(&response, CONTENT_TYPE), expected_extension) {
            debug!("retrying {} with alternate Accept header ({})", url, response.status());
            response = self.send(url, referer, ALTERNATE_ACCEPT).await?;
        }

        let response = response
            .error_for_status()
            .with_context(|| format!("downloading {}", url))?;
        let content_type = header_str(&response, CONTENT_TYPE).unwrap_or_default().to_string();
        let content_disposition = header_str(&response, CONTENT_DISPOSITION).map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("reading body of {}", url))?;

        Ok(Fetched {
            bytes: bytes.to_vec(),
            content_type,
            content_disposition,
        })
    }
}

#[async_trait]
impl FileDownloader for HttpDownloader {
    async fn download(&self, target: &ReportTarget, dest_dir: &Path) -> Result<DownloadedFile> {
        let url = target.url();
        let referer = referer_for(target);
        let referer = referer.as_str();
        let expected_extension = target.file_extension.as_str();

        let fetched = self
            .retry
            .run(&format!("download {}", url), move || {
                self.fetch_once(url, referer, expected_extension)
            })
            .await?;

        let file_name = build_file_name(
            &target.report,
            fetched.content_disposition.as_deref(),
            &fetched.content_type,
            expected_extension,
        );

        let path = write_new_file(dest_dir, &file_name, &fetched.bytes).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(file_name);

        let checksum = format!("{:x}", md5::compute(&fetched.bytes));
        info!("💾 saved {} ({} bytes)", path.display(), fetched.bytes.len());

        Ok(DownloadedFile {
            title: target.report.title.clone(),
            category: target.report.category.clone(),
            year: target.report.year,
            quarter: target.report.quarter,
            url: url.to_string(),
            file_type: file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .unwrap_or_default(),
            file_name,
            file_path: path.display().to_string(),
            size: fetched.bytes.len() as u64,
            checksum,
            download_timestamp: Local::now(),
            source_page: target.source_url.clone(),
        })
    }
}

/// Store `bytes` as `file_name` in `dir` without replacing an existing file.
///
/// Taken names get a numeric suffix before the extension: `a.pdf`, `a_1.pdf`, ...
pub async fn write_new_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
        _ => (file_name, String::new()),
    };

    for attempt in 0..MAX_NAME_COLLISIONS {
        let candidate = if attempt == 0 {
            file_name.to_string()
        } else {
            format!("{}_{}{}", stem, attempt, ext)
        };
        let path = dir.join(candidate);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(bytes)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e).with_context(|| format!("creating {}", path.display())),
        }
    }

    anyhow::bail!("no free file name for {} in {}", file_name, dir.display())
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<&str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// 403, or an HTML page where a document was expected
fn needs_alternate_accept(status: StatusCode, content_type: Option<&str>, expected_extension: &str) -> bool {
    if status == StatusCode::FORBIDDEN {
        return true;
    }
    let is_html = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
    let expects_document = !expected_extension.is_empty() && !matches!(expected_extension, "html" | "htm");
    is_html && expects_document
}

/// Page the link was found on, else the origin of the file URL
fn referer_for(target: &ReportTarget) -> String {
    if !target.source_url.is_empty() {
        return target.source_url.clone();
    }
    Url::parse(target.url())
        .map(|u| format!("{}/", u.origin().ascii_serialization()))
        .unwrap_or_default()
}

/// Extension with a leading dot, from the URL first and then the content type
pub fn extension_for(url: &str, known_extension: &str, content_type: &str) -> String {
    if !known_extension.is_empty() {
        return format!(".{}", known_extension);
    }
    let from_url = file_extension_of(url);
    if !from_url.is_empty() {
        return format!(".{}", from_url);
    }
    let content_type = content_type.to_ascii_lowercase();
    let ext = if content_type.contains("pdf") {
        ".pdf"
    } else if content_type.contains("html") {
        ".html"
    } else if content_type.contains("spreadsheet") || content_type.contains("excel") {
        ".xlsx"
    } else if content_type.contains("zip") {
        ".zip"
    } else if content_type.contains("word") {
        ".docx"
    } else if content_type.contains("text/plain") {
        ".txt"
    } else {
        ".bin"
    };
    ext.to_string()
}

/// File name from a `Content-Disposition` header; `filename*` wins over `filename`
pub fn disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.rsplit("''").next().unwrap_or(value);
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    if !decoded.trim().is_empty() {
                        return Some(decoded.trim().to_string());
                    }
                }
            }
            "filename" if !value.is_empty() => plain = Some(value.to_string()),
            _ => {}
        }
    }
    plain
}

/// Descriptive name for a downloaded report.
///
/// Title plus period when the extraction gave a title, else the server's
/// suggested name, else the last URL segment, else `download`.
pub fn build_file_name(
    report: &ExtractedReport,
    content_disposition: Option<&str>,
    content_type: &str,
    known_extension: &str,
) -> String {
    let ext = extension_for(&report.url, known_extension, content_type);

    let title = report.title.trim();
    if !title.is_empty() {
        let stem = match (report.year, report.quarter) {
            (Some(year), Some(quarter)) => format!("{}_{}Q{}", title, year, quarter),
            _ => title.to_string(),
        };
        return with_extension(sanitize_file_name(&stem), &ext);
    }

    if let Some(name) = content_disposition.and_then(disposition_file_name) {
        return sanitize_file_name(&name);
    }

    let last_segment = Url::parse(&report.url)
        .ok()
        .and_then(|u| u.path_segments()?.last().map(str::to_string))
        .map(|segment| urlencoding::decode(&segment).map(|s| s.into_owned()).unwrap_or(segment))
        .filter(|segment| !segment.trim().is_empty());
    match last_segment {
        Some(segment) if segment.contains('.') => sanitize_file_name(&segment),
        Some(segment) => with_extension(sanitize_file_name(&segment), &ext),
        None => format!("download{}", ext),
    }
}

fn with_extension(stem: String, ext: &str) -> String {
    if stem.to_lowercase().ends_with(ext) {
        stem
    } else {
        format!("{}{}", stem, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(title: &str, url: &str, year: Option<i32>, quarter: Option<u8>) -> ExtractedReport {
        ExtractedReport {
            title: title.to_string(),
            category: "earnings_release".to_string(),
            url: url.to_string(),
            year,
            quarter,
        }
    }

    #[test]
    fn title_and_period_make_the_name() {
        let r = report("Q3 Results: Press/Release", "https://ir.acme.com/files/abc.pdf", Some(2025), Some(3));
        assert_eq!(build_file_name(&r, None, "", "pdf"), "Q3 Results_ Press_Release_2025Q3.pdf");
    }

    #[test]
    fn falls_back_to_content_disposition_then_url() {
        let r = report("", "https://ir.acme.com/static-files/7b1c2d", None, None);
        assert_eq!(
            build_file_name(&r, Some("attachment; filename=\"plain.pdf\"; filename*=UTF-8''Q3%202025%20Deck.pdf"), "application/pdf", ""),
            "Q3 2025 Deck.pdf"
        );
        assert_eq!(build_file_name(&r, Some("attachment; filename=\"plain.pdf\""), "application/pdf", ""), "plain.pdf");
        assert_eq!(build_file_name(&r, None, "application/pdf", ""), "7b1c2d.pdf");

        let root = report("", "https://ir.acme.com/", None, None);
        assert_eq!(build_file_name(&root, None, "application/zip", ""), "download.zip");
    }

    #[test]
    fn extension_from_content_type() {
        assert_eq!(extension_for("https://x.com/dl", "", "text/html; charset=utf-8"), ".html");
        assert_eq!(
            extension_for("https://x.com/dl", "", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            ".xlsx"
        );
        assert_eq!(extension_for("https://x.com/dl", "", ""), ".bin");
        assert_eq!(extension_for("https://x.com/a.PDF", "", "text/html"), ".pdf");
    }

    #[tokio::test]
    async fn same_name_twice_keeps_both_files() {
        let dir = tempfile::tempdir().unwrap();

        let first = write_new_file(dir.path(), "Q3 2025 Earnings_2025Q3.pdf", b"release").await.unwrap();
        let second = write_new_file(dir.path(), "Q3 2025 Earnings_2025Q3.pdf", b"slides").await.unwrap();
        let bare = write_new_file(dir.path(), "download", b"x").await.unwrap();
        let bare_again = write_new_file(dir.path(), "download", b"y").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "Q3 2025 Earnings_2025Q3.pdf");
        assert_eq!(second.file_name().unwrap(), "Q3 2025 Earnings_2025Q3_1.pdf");
        assert_eq!(std::fs::read(&first).unwrap(), b"release");
        assert_eq!(std::fs::read(&second).unwrap(), b"slides");
        assert_eq!(bare_again.file_name().unwrap(), "download_1");
        assert_ne!(bare, bare_again);
    }

    #[test]
    fn alternate_accept_on_forbidden_or_unexpected_html() {
        assert!(needs_alternate_accept(StatusCode::FORBIDDEN, None, ""));
        assert!(needs_alternate_accept(StatusCode::OK, Some("text/html"), "pdf"));
        assert!(!needs_alternate_accept(StatusCode::OK, Some("text/html"), "html"));
        assert!(!needs_alternate_accept(StatusCode::OK, Some("application/pdf"), "pdf"));
    }
}
