//! Link classification - business capability layer
//!
//! Pure functions over URLs: what a link points at, whether two URLs share a
//! site, and whether a host belongs to a third-party platform we never crawl.

use url::Url;

use crate::infrastructure::RawAnchor;
use crate::models::document_link::file_extension_of;
use crate::models::{DocumentLink, LinkType};

/// Extensions that mark a link as a downloadable document
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "rar", "csv", "txt", "rtf", "xml",
    "json",
];

/// URL fragments of endpoints that serve files without a visible extension
pub const DOCUMENT_KEYWORDS: &[&str] = &["file", "download", "document", "attachment"];

/// Third-party investor-calendar, webcast and meeting platforms
pub const DEFAULT_EXCLUSION_DOMAINS: &[&str] = &[
    "q4inc.com",
    "investorcalendar.com",
    "webcast.com",
    "eventbrite.com",
    "zoom.us",
    "teams.microsoft.com",
    "webex.com",
    "gotomeeting.com",
];

const NON_NAVIGATIONAL_SCHEMES: &[&str] = &["mailto:", "javascript:", "tel:", "data:"];

/// Resolve `href` against the page it was found on.
///
/// Returns `None` for empty, fragment-only, non-http or unparseable hrefs.
/// The fragment is dropped, so `page#top` and `page` resolve to the same URL.
pub fn resolve_href(href: &str, page_url: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lowered = href.to_ascii_lowercase();
    if NON_NAVIGATIONAL_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return None;
    }

    let mut resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(page_url).ok()?.join(href).ok()?,
        Err(_) => return None,
    };

    resolved.set_fragment(None);
    match resolved.scheme() {
        "http" | "https" if resolved.host_str().is_some() => Some(resolved),
        _ => None,
    }
}

/// Classify `href` relative to the crawl's base URL
pub fn classify(href: &str, base_url: &str) -> LinkType {
    let resolved = match resolve_href(href, base_url) {
        Some(url) => url,
        None => return LinkType::Invalid,
    };

    let extension = file_extension_of(resolved.as_str());
    if DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
        return LinkType::Document;
    }

    let lowered = resolved.as_str().to_lowercase();
    if DOCUMENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return LinkType::Document;
    }

    if href.trim_start().starts_with('/') || is_same_domain(resolved.as_str(), base_url) {
        LinkType::Internal
    } else {
        LinkType::External
    }
}

/// True when both URLs have the same host
pub fn is_same_domain(url: &str, base_url: &str) -> bool {
    match (host_of(url), host_of(base_url)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// True when the URL's host is, or is a subdomain of, an excluded domain
pub fn is_excluded<S: AsRef<str>>(url: &str, domains: &[S]) -> bool {
    let host = match host_of(url) {
        Some(host) => host,
        None => return false,
    };
    domains.iter().any(|domain| {
        let domain = domain.as_ref().trim().trim_start_matches('.').to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
}

/// Build a [`DocumentLink`] from a rendered anchor; `None` means skip it.
///
/// The href is resolved against `page_url`, the page the anchor was found on.
pub fn document_link_from_anchor(
    anchor: &RawAnchor,
    page_url: &str,
    base_url: &str,
) -> Option<DocumentLink> {
    let resolved = resolve_href(&anchor.href, page_url)?;
    let href = resolved.to_string();
    let link_type = classify(&href, base_url);
    Some(DocumentLink::new(
        href,
        &anchor.text,
        &anchor.title,
        link_type,
        page_url,
        &anchor.html,
    ))
}
