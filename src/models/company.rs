use serde::{Deserialize, Serialize};

/// One roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub ticker: String,
    /// Investor-relations landing page; the crawl seed
    pub ir_url: String,
}

impl Company {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>, ir_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
            ir_url: ir_url.into(),
        }
    }

    /// Name usable as a file or directory name
    pub fn file_stem(&self) -> String {
        sanitize_file_name(&self.name)
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
