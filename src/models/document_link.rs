use std::fmt;

use serde::{Deserialize, Serialize};

/// What a discovered hyperlink points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// A downloadable file, or an endpoint that serves one
    Document,
    /// A page on the crawled site
    Internal,
    /// A page on another site
    External,
    /// Empty, unparseable, or not an http(s) target
    Invalid,
}

impl LinkType {
    pub fn name(self) -> &'static str {
        match self {
            LinkType::Document => "document",
            LinkType::Internal => "internal",
            LinkType::External => "external",
            LinkType::Invalid => "invalid",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One hyperlink discovered during a crawl.
///
/// `href` is always absolute and is the identity of the link: collections
/// dedupe on [`DocumentLink::key`], never on the anchor text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub href: String,
    pub text: String,
    pub title: String,
    pub link_type: LinkType,
    /// Page the link was found on
    pub source_url: String,
    /// Lowercase extension of the last path segment, empty if none
    pub file_extension: String,
    /// Human label for the extension, "unknown" if there is none
    pub document_type: String,
    /// Outer HTML of the anchor
    pub html: String,
}

impl DocumentLink {
    pub fn new(
        href: String,
        text: &str,
        title: &str,
        link_type: LinkType,
        source_url: &str,
        html: &str,
    ) -> Self {
        let file_extension = file_extension_of(&href);
        let document_type = document_type_for(&file_extension);
        Self {
            href,
            text: text.trim().to_string(),
            title: title.trim().to_string(),
            link_type,
            source_url: source_url.to_string(),
            file_extension,
            document_type,
            html: html.to_string(),
        }
    }

    /// Identity key for set semantics
    pub fn key(&self) -> &str {
        &self.href
    }

    pub fn is_document(&self) -> bool {
        self.link_type == LinkType::Document
    }
}

impl fmt::Display for DocumentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) [{}] -> {}",
            self.text, self.title, self.document_type, self.href
        )
    }
}

/// Extension of the last path segment of `url`, lowercased
pub fn file_extension_of(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Human label for an extension
pub fn document_type_for(extension: &str) -> String {
    let label = match extension {
        "" => return "unknown".to_string(),
        "pdf" => "PDF Document",
        "doc" | "docx" => "Word Document",
        "xls" | "xlsx" => "Excel Spreadsheet",
        "ppt" | "pptx" => "PowerPoint Presentation",
        "zip" | "rar" => "Archive",
        "csv" => "CSV Data",
        "txt" => "Text Document",
        "rtf" => "Rich Text",
        "xml" => "XML Document",
        "json" => "JSON Data",
        "html" | "htm" => "Web Page",
        "wav" | "mp3" => "Audio File",
        other => return format!("{} File", other.to_uppercase()),
    };
    label.to_string()
}
