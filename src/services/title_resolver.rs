//! Document title lookup - business capability layer
//!
//! Redirect endpoints such as `/static-files/<id>` carry no date in their
//! anchor or URL. The file name the server suggests for the PDF usually does.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT};
use tracing::debug;

use crate::browser::headless::USER_AGENT as BROWSER_USER_AGENT;
use crate::services::file_downloader::disposition_file_name;

const PDF_ACCEPT: &str = "application/pdf,application/octet-stream;q=0.9,*/*;q=0.8";

/// Server-suggested name of a document, used as its title
#[async_trait]
pub trait TitleResolver: Send + Sync {
    /// `None` when the URL does not serve a PDF or suggests no name
    async fn resolve(&self, url: &str) -> Option<String>;
}

/// Reads `Content-Disposition` from the response headers without downloading the body
pub struct HttpTitleResolver {
    client: reqwest::Client,
}

impl HttpTitleResolver {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TitleResolver for HttpTitleResolver {
    async fn resolve(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, PDF_ACCEPT)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!("title lookup failed for {}: {}", url, e);
                return None;
            }
        };

        let headers = response.headers();
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        if !serves_pdf(content_type) {
            return None;
        }
        headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name)
    }
}

fn serves_pdf(content_type: Option<&str>) -> bool {
    content_type
        .map(str::to_ascii_lowercase)
        .is_some_and(|ct| ct.contains("application/pdf") || ct.contains("octet-stream"))
}
