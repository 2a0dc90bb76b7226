use std::fmt;

use thiserror::Error;

/// Pipeline stage of a single company run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Crawl,
    Extraction,
    Download,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Crawl => "crawl",
            Stage::Extraction => "extraction",
            Stage::Download => "download",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Browser errors
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// A stage of a company run failed after exhausting its retries
    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },

    /// Missing credentials or a missing intermediate artifact
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// File errors
    #[error("file error: {0}")]
    File(#[from] FileError),
}

/// Browser errors
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not connect to browser on port {port}: {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },

    #[error("could not launch headless browser: {0}")]
    LaunchFailed(String),

    #[error("navigation to {url} failed: {message}")]
    NavigationFailed { url: String, message: String },

    #[error("navigation to {url} timed out after {seconds}s")]
    NavigationTimeout { url: String, seconds: u64 },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// File errors
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("could not read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== Convenience constructors ==========

impl AppError {
    /// Wrap a stage error, keeping the whole context chain in the message
    pub fn stage(stage: Stage, source: anyhow::Error) -> Self {
        AppError::Stage {
            stage,
            message: format!("{:#}", source),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        AppError::Precondition(message.into())
    }

    pub fn navigation_failed(url: impl Into<String>, message: impl fmt::Display) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            message: message.to_string(),
        })
    }
}

// ========== Result alias ==========

pub type AppResult<T> = Result<T, AppError>;
