use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::infrastructure::{RandomDelay, RetryPolicy};

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of companies processed at the same time
    pub max_concurrent_companies: usize,
    /// Debug port of an already running Chrome; a headless browser is launched when unset
    pub browser_debug_port: Option<u16>,
    /// Chrome/Chromium executable for the headless launch
    pub chrome_executable: Option<String>,
    /// TOML roster of companies to process
    pub companies_file: String,
    /// Restrict the run to these company names (empty means all)
    pub company_filter: Vec<String>,
    /// Per-company link dumps
    pub ir_links_dir: String,
    /// Per-company extracted report lists
    pub extracted_reports_dir: String,
    /// Downloaded files, one sub-directory per company
    pub downloads_dir: String,
    /// One JSON record per company run
    pub metadata_dir: String,
    /// Run log with the final summary
    pub output_log_file: String,
    /// Log every promising link and relevance decision
    pub verbose_logging: bool,
    // --- crawl ---
    pub crawl_max_depth: usize,
    pub max_promising_links: usize,
    pub page_timeout_secs: u64,
    pub page_retries: u32,
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,
    /// Look up the server-suggested name of every document found
    pub resolve_document_titles: bool,
    // --- download ---
    pub download_retries: u32,
    pub download_delay_min_ms: u64,
    pub download_delay_max_ms: u64,
    // --- LLM extraction ---
    pub extraction_min_interval_secs: u64,
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_companies: 10,
            browser_debug_port: None,
            chrome_executable: None,
            companies_file: "companies.toml".to_string(),
            company_filter: Vec::new(),
            ir_links_dir: "ir_links".to_string(),
            extracted_reports_dir: "extracted_reports".to_string(),
            downloads_dir: "downloads".to_string(),
            metadata_dir: "metadata".to_string(),
            output_log_file: "pipeline_log.txt".to_string(),
            verbose_logging: false,
            crawl_max_depth: 2,
            max_promising_links: 5,
            page_timeout_secs: 30,
            page_retries: 2,
            page_delay_min_ms: 2000,
            page_delay_max_ms: 4000,
            resolve_document_titles: true,
            download_retries: 2,
            download_delay_min_ms: 500,
            download_delay_max_ms: 1500,
            extraction_min_interval_secs: 15,
            llm_api_key: None,
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-flash-lite-latest".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_companies: env_parse("MAX_CONCURRENT_COMPANIES").unwrap_or(default.max_concurrent_companies),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(default.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            companies_file: std::env::var("COMPANIES_FILE").unwrap_or(default.companies_file),
            company_filter: std::env::var("COMPANIES")
                .map(|v| {
                    v.split(',')
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty())
                        .collect()
                })
                .unwrap_or(default.company_filter),
            ir_links_dir: std::env::var("IR_LINKS_DIR").unwrap_or(default.ir_links_dir),
            extracted_reports_dir: std::env::var("EXTRACTED_REPORTS_DIR").unwrap_or(default.extracted_reports_dir),
            downloads_dir: std::env::var("DOWNLOADS_DIR").unwrap_or(default.downloads_dir),
            metadata_dir: std::env::var("METADATA_DIR").unwrap_or(default.metadata_dir),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            crawl_max_depth: env_parse("CRAWL_MAX_DEPTH").unwrap_or(default.crawl_max_depth),
            max_promising_links: env_parse("MAX_PROMISING_LINKS").unwrap_or(default.max_promising_links),
            page_timeout_secs: env_parse("PAGE_TIMEOUT_SECS").unwrap_or(default.page_timeout_secs),
            page_retries: env_parse("PAGE_RETRIES").unwrap_or(default.page_retries),
            page_delay_min_ms: env_parse("PAGE_DELAY_MIN_MS").unwrap_or(default.page_delay_min_ms),
            page_delay_max_ms: env_parse("PAGE_DELAY_MAX_MS").unwrap_or(default.page_delay_max_ms),
            resolve_document_titles: env_parse("RESOLVE_DOCUMENT_TITLES").unwrap_or(default.resolve_document_titles),
            download_retries: env_parse("DOWNLOAD_RETRIES").unwrap_or(default.download_retries),
            download_delay_min_ms: env_parse("DOWNLOAD_DELAY_MIN_MS").unwrap_or(default.download_delay_min_ms),
            download_delay_max_ms: env_parse("DOWNLOAD_DELAY_MAX_MS").unwrap_or(default.download_delay_max_ms),
            extraction_min_interval_secs: env_parse("EXTRACTION_MIN_INTERVAL_SECS").unwrap_or(default.extraction_min_interval_secs),
            llm_api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_companies == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_companies",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.page_delay_min_ms > self.page_delay_max_ms {
            return Err(ConfigError::Invalid {
                field: "page_delay_min_ms",
                reason: format!("{} exceeds page_delay_max_ms {}", self.page_delay_min_ms, self.page_delay_max_ms),
            });
        }
        if self.download_delay_min_ms > self.download_delay_max_ms {
            return Err(ConfigError::Invalid {
                field: "download_delay_min_ms",
                reason: format!(
                    "{} exceeds download_delay_max_ms {}",
                    self.download_delay_min_ms, self.download_delay_max_ms
                ),
            });
        }
        Ok(())
    }

    /// Worker slots actually used for a roster of `company_count`
    pub fn worker_count(&self, company_count: usize) -> usize {
        self.max_concurrent_companies.min(company_count).max(1)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn page_delay(&self) -> RandomDelay {
        RandomDelay::from_millis(self.page_delay_min_ms, self.page_delay_max_ms)
    }

    pub fn download_delay(&self) -> RandomDelay {
        RandomDelay::from_millis(self.download_delay_min_ms, self.download_delay_max_ms)
    }

    /// Page renders: 2s, 4s, ... plus up to 1.25s of jitter
    pub fn page_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.page_retries + 1,
            Duration::from_secs(2),
            Duration::from_millis(1250),
        )
    }

    /// Title lookups only read headers, so they get a shorter budget than downloads
    pub fn title_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs.clamp(1, 10))
    }

    pub fn download_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.download_retries + 1,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
    }

    pub fn extraction_min_interval(&self) -> Duration {
        Duration::from_secs(self.extraction_min_interval_secs)
    }
}

fn env_parse<T: FromStr>(var_name: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("⚠️ ignoring {}='{}': not a valid value", var_name, value);
            None
        }
    }
}
