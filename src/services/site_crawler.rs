//! Site crawler - business capability layer
//!
//! Breadth-first traversal of one IR site with a hard depth ceiling. Only the
//! seed page is scored for promising navigation links; deeper pages are
//! harvested for anchors but never expanded.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::infrastructure::{PageRenderer, RandomDelay, RetryPolicy};
use crate::models::{CrawlFrontier, DocumentLink, FiscalPeriod, LinkType};
use crate::services::link_classifier::{
    document_link_from_anchor, is_excluded, is_same_domain, DEFAULT_EXCLUSION_DOMAINS,
};
use crate::services::period_extractor::PeriodExtractor;
use crate::services::relevance_filter::retain_latest;
use crate::services::title_resolver::TitleResolver;

/// Vocabulary used to score navigation links on the seed page
pub const QUARTERLY_KEYWORDS: &[&str] = &[
    "quarterly-result",
    "quarterly-report",
    "income-statement",
    "quarterly-earning",
    "financial-information",
    "financial-report",
    "financial-statements",
    "q1",
    "q2",
    "q3",
    "q4",
    "1q",
    "2q",
    "3q",
    "4q",
    "10-q",
    "10-k",
];

/// Immutable crawl configuration shared by every crawl session
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Pages deeper than this are skipped
    pub max_depth: usize,
    /// Promising links followed from the seed page
    pub max_promising_links: usize,
    pub exclusion_domains: Vec<String>,
    pub keywords: Vec<String>,
    pub retry_policy: RetryPolicy,
    /// Pause between two page visits
    pub page_delay: RandomDelay,
    pub verbose: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_promising_links: 5,
            exclusion_domains: DEFAULT_EXCLUSION_DOMAINS.iter().map(|d| d.to_string()).collect(),
            keywords: QUARTERLY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            retry_policy: RetryPolicy::none(),
            page_delay: RandomDelay::none(),
            verbose: false,
        }
    }
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.crawl_max_depth,
            max_promising_links: config.max_promising_links,
            retry_policy: config.page_retry_policy(),
            page_delay: config.page_delay(),
            verbose: config.verbose_logging,
            ..Self::default()
        }
    }
}

/// Result of one crawl session
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Documents of the latest period, in discovery order
    pub documents: Vec<DocumentLink>,
    pub pages_visited: usize,
    /// Distinct links seen across all visited pages
    pub links_found: usize,
    pub latest_period: FiscalPeriod,
}

/// A navigation link worth following, with its keyword score
#[derive(Debug, Clone)]
pub struct PromisingLink {
    pub link: DocumentLink,
    pub score: usize,
}

pub struct SiteCrawler {
    renderer: Arc<dyn PageRenderer>,
    settings: Arc<CrawlSettings>,
    extractor: PeriodExtractor,
    title_resolver: Option<Arc<dyn TitleResolver>>,
}

impl SiteCrawler {
    pub fn new(renderer: Arc<dyn PageRenderer>, settings: Arc<CrawlSettings>, extractor: PeriodExtractor) -> Self {
        Self {
            renderer,
            settings,
            extractor,
            title_resolver: None,
        }
    }

    /// Replace document titles with the server-suggested file name before period filtering
    pub fn with_title_resolver(mut self, resolver: Arc<dyn TitleResolver>) -> Self {
        self.title_resolver = Some(resolver);
        self
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Crawl `base_url` and return the documents of its latest period.
    ///
    /// Unreachable pages are skipped; only an unusable base URL is an error.
    pub async fn crawl(&self, label: &str, base_url: &str) -> Result<CrawlOutcome> {
        let mut seed = Url::parse(base_url).with_context(|| format!("invalid IR URL '{}'", base_url))?;
        if !matches!(seed.scheme(), "http" | "https") {
            bail!("unsupported scheme in IR URL '{}'", base_url);
        }
        // same form as resolved hrefs, so the seed is never queued twice
        seed.set_fragment(None);
        let base_url = seed.as_str();

        let settings = &self.settings;
        let mut frontier = CrawlFrontier::new(base_url);

        while let Some((url, depth)) = frontier.pop() {
            if frontier.is_visited(&url) {
                continue;
            }
            if depth > settings.max_depth {
                debug!("[{}] skipping {} at depth {} (limit {})", label, url, depth, settings.max_depth);
                continue;
            }

            if frontier.visited_count() > 0 {
                settings.page_delay.pause().await;
            }
            frontier.mark_visited(&url);
            info!("[{}] 🌐 visiting {} (depth {})", label, url, depth);

            let renderer = &self.renderer;
            let target = url.as_str();
            let page = match settings
                .retry_policy
                .run(&format!("render {}", url), move || renderer.render(target))
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("[{}] ⚠️ page unreachable, skipping: {:#}", label, e);
                    continue;
                }
            };

            let mut page_links = Vec::with_capacity(page.anchors.len());
            for anchor in &page.anchors {
                if let Some(link) = document_link_from_anchor(anchor, &page.url, base_url) {
                    page_links.push(link.clone());
                    frontier.collect(link);
                }
            }
            debug!("[{}] {} anchors on {}", label, page_links.len(), url);

            if depth == 0 {
                for promising in self.promising_links(&page_links) {
                    if settings.verbose {
                        info!(
                            "[{}] 🔎 promising (score {}): {}",
                            label, promising.score, promising.link.href
                        );
                    }
                    if is_same_domain(&promising.link.href, base_url) {
                        if !frontier.is_visited(&promising.link.href) {
                            frontier.enqueue(promising.link.href, depth + 1);
                        }
                    } else {
                        debug!("[{}] recording external link without following: {}", label, promising.link.href);
                    }
                }
            }
        }

        let (pages_visited, collected) = frontier.finish();
        let links_found = collected.len();
        if collected.is_empty() {
            warn!("[{}] ⚠️ no links found on {}", label, base_url);
        }
        let mut documents: Vec<DocumentLink> = collected.into_vec().into_iter().filter(DocumentLink::is_document).collect();
        if let Some(resolver) = &self.title_resolver {
            resolve_titles(label, resolver.as_ref(), &mut documents).await;
        }
        let document_count = documents.len();
        let (latest_period, documents) = retain_latest(documents, &self.extractor);

        if settings.verbose {
            for doc in &documents {
                info!("[{}] 📄 {}", label, doc);
            }
        }
        info!(
            "[{}] ✓ crawl finished: {} page(s), {} link(s), {} document(s), {} for {}",
            label,
            pages_visited,
            links_found,
            document_count,
            documents.len(),
            latest_period
        );

        Ok(CrawlOutcome {
            documents,
            pages_visited,
            links_found,
            latest_period,
        })
    }

    /// Top-scoring navigation links on a page, best first.
    ///
    /// Documents, invalid links and excluded domains never qualify. A URL
    /// appearing several times is ranked once with its best score.
    pub fn promising_links(&self, links: &[DocumentLink]) -> Vec<PromisingLink> {
        let mut best: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&DocumentLink> = Vec::new();

        for link in links {
            if !matches!(link.link_type, LinkType::Internal | LinkType::External) {
                continue;
            }
            if is_excluded(&link.href, &self.settings.exclusion_domains) {
                continue;
            }
            let score = navigation_score(link, &self.settings.keywords);
            if score == 0 {
                continue;
            }
            match best.get_mut(link.key()) {
                Some(current) => *current = (*current).max(score),
                None => {
                    best.insert(link.key(), score);
                    order.push(link);
                }
            }
        }

        let mut ranked: Vec<PromisingLink> = order
            .into_iter()
            .map(|link| PromisingLink {
                score: best.get(link.key()).copied().unwrap_or_default(),
                link: link.clone(),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(self.settings.max_promising_links);
        ranked
    }
}

async fn resolve_titles(label: &str, resolver: &dyn TitleResolver, documents: &mut [DocumentLink]) {
    for doc in documents.iter_mut() {
        if let Some(title) = resolver.resolve(&doc.href).await {
            debug!("[{}] title of {} is '{}'", label, doc.href, title);
            doc.title = title;
        }
    }
}

/// Keyword hits across anchor HTML, text, title and URL.
///
/// Each field counts at most once per keyword.
pub fn navigation_score<S: AsRef<str>>(link: &DocumentLink, keywords: &[S]) -> usize {
    let fields = [
        link.html.to_lowercase(),
        link.text.to_lowercase().replace(' ', "-"),
        link.title.to_lowercase().replace(' ', "-"),
        link.href.to_lowercase().replace(' ', "-"),
    ];
    keywords
        .iter()
        .map(|keyword| {
            let keyword = keyword.as_ref();
            fields.iter().filter(|field| field.contains(keyword)).count()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{RawAnchor, RenderedPage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned anchors per URL and records every render
    #[derive(Default)]
    struct FakeRenderer {
        pages: HashMap<String, Vec<RawAnchor>>,
        rendered: Mutex<Vec<String>>,
    }

    impl FakeRenderer {
        fn page(mut self, url: &str, anchors: Vec<RawAnchor>) -> Self {
            self.pages.insert(url.to_string(), anchors);
            self
        }

        fn rendered(&self) -> Vec<String> {
            self.rendered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage> {
            self.rendered.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(anchors) => Ok(RenderedPage {
                    url: url.to_string(),
                    anchors: anchors.clone(),
                }),
                None => bail!("connection refused"),
            }
        }
    }

    const BASE: &str = "https://ir.acme.com/";

    fn crawler(renderer: Arc<FakeRenderer>, settings: CrawlSettings) -> SiteCrawler {
        SiteCrawler::new(renderer, Arc::new(settings), PeriodExtractor::new(2025))
    }

    fn seed_anchors() -> Vec<RawAnchor> {
        vec![
            RawAnchor::new("/quarterly-results", "Quarterly Results"),
            RawAnchor::new("https://events.q4inc.com/q3-2025-quarterly-results", "Q3 2025 Quarterly Results Webcast"),
            RawAnchor::new("/about", "About us"),
            RawAnchor::new("/files/q2-2025-10-q.pdf", "Q2 2025 10-Q"),
        ]
    }

    #[tokio::test]
    async fn depth_zero_never_leaves_the_seed() {
        let renderer = Arc::new(
            FakeRenderer::default()
                .page(BASE, seed_anchors())
                .page("https://ir.acme.com/quarterly-results", vec![RawAnchor::new("/q3.pdf", "Q3 2025")]),
        );
        let settings = CrawlSettings {
            max_depth: 0,
            ..CrawlSettings::default()
        };

        let outcome = crawler(renderer.clone(), settings).crawl("acme", BASE).await.unwrap();

        assert_eq!(renderer.rendered(), vec![BASE.to_string()]);
        assert_eq!(outcome.pages_visited, 1);
        assert_eq!(outcome.documents.len(), 1);
    }

    #[tokio::test]
    async fn follows_promising_same_domain_links_and_filters_to_latest_quarter() {
        let renderer = Arc::new(
            FakeRenderer::default().page(BASE, seed_anchors()).page(
                "https://ir.acme.com/quarterly-results",
                vec![
                    RawAnchor::new("/files/q3-2025-earnings.pdf", "Q3 2025 Earnings Release"),
                    RawAnchor::new("/files/q3-2025-earnings.pdf", "Download"),
                    RawAnchor::new("/files/shareholder-letter.pdf", "Shareholder letter"),
                    RawAnchor::new("/quarterly-results/archive", "Q1 2025 archive"),
                ],
            ),
        );

        let outcome = crawler(renderer.clone(), CrawlSettings::default())
            .crawl("acme", BASE)
            .await
            .unwrap();

        let rendered = renderer.rendered();
        assert_eq!(rendered[0], BASE);
        assert!(rendered.contains(&"https://ir.acme.com/quarterly-results".to_string()));
        assert!(!rendered.iter().any(|u| u.contains("q4inc.com")));
        assert!(!rendered.contains(&"https://ir.acme.com/quarterly-results/archive".to_string()));

        let hrefs: Vec<_> = outcome.documents.iter().map(|d| d.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "https://ir.acme.com/files/q3-2025-earnings.pdf",
                "https://ir.acme.com/files/shareholder-letter.pdf",
            ]
        );
        assert_eq!(outcome.latest_period, FiscalPeriod::new(2025, 3));
    }

    #[tokio::test]
    async fn seed_is_rendered_once_whatever_its_spelling() {
        let renderer = Arc::new(
            FakeRenderer::default()
                .page(
                    BASE,
                    vec![
                        RawAnchor::new("/#quarterly-results", "Quarterly Results"),
                        RawAnchor::new("/financial-report#q3", "Financial report Q3"),
                        RawAnchor::new("/financial-report", "Financial report"),
                    ],
                )
                .page("https://ir.acme.com/financial-report", vec![]),
        );

        let outcome = crawler(renderer.clone(), CrawlSettings::default())
            .crawl("acme", "https://ir.acme.com#top")
            .await
            .unwrap();

        assert_eq!(
            renderer.rendered(),
            vec![BASE.to_string(), "https://ir.acme.com/financial-report".to_string()]
        );
        assert_eq!(outcome.pages_visited, 2);
    }

    /// Suggests a file name for known URLs only
    struct FakeTitles(HashMap<String, String>);

    #[async_trait]
    impl TitleResolver for FakeTitles {
        async fn resolve(&self, url: &str) -> Option<String> {
            self.0.get(url).cloned()
        }
    }

    #[tokio::test]
    async fn resolved_titles_date_opaque_document_endpoints() {
        let renderer = Arc::new(FakeRenderer::default().page(
            BASE,
            vec![
                RawAnchor::new("/static-files/7b1c2d", "Earnings release"),
                RawAnchor::new("/static-files/9e8f7a", "Presentation"),
                RawAnchor::new("/files/q2-2025-10-q.pdf", "Q2 2025 10-Q"),
            ],
        ));
        let titles = FakeTitles(HashMap::from([
            (
                "https://ir.acme.com/static-files/7b1c2d".to_string(),
                "Q3-2025-Earnings-Release.pdf".to_string(),
            ),
            (
                "https://ir.acme.com/static-files/9e8f7a".to_string(),
                "Q1-2025-Investor-Presentation.pdf".to_string(),
            ),
        ]));

        let outcome = crawler(renderer, CrawlSettings::default())
            .with_title_resolver(Arc::new(titles))
            .crawl("acme", BASE)
            .await
            .unwrap();

        assert_eq!(outcome.latest_period, FiscalPeriod::new(2025, 3));
        let kept: Vec<_> = outcome.documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(kept, vec!["Q3-2025-Earnings-Release.pdf"]);
    }

    #[tokio::test]
    async fn unreachable_pages_do_not_fail_the_crawl() {
        let renderer = Arc::new(FakeRenderer::default());
        let outcome = crawler(renderer, CrawlSettings::default()).crawl("acme", BASE).await.unwrap();
        assert_eq!(outcome.pages_visited, 1);
        assert!(outcome.documents.is_empty());
    }

    #[tokio::test]
    async fn invalid_base_url_is_an_error() {
        let renderer = Arc::new(FakeRenderer::default());
        let c = crawler(renderer, CrawlSettings::default());
        assert!(c.crawl("acme", "not a url").await.is_err());
        assert!(c.crawl("acme", "ftp://ir.acme.com/").await.is_err());
    }

    #[test]
    fn excluded_domain_is_never_promising_even_with_top_score() {
        let c = crawler(Arc::new(FakeRenderer::default()), CrawlSettings::default());
        let links: Vec<DocumentLink> = seed_anchors()
            .iter()
            .filter_map(|a| document_link_from_anchor(a, BASE, BASE))
            .collect();

        let excluded = &links[1];
        assert!(navigation_score(excluded, &c.settings().keywords) > navigation_score(&links[0], &c.settings().keywords));

        let promising = c.promising_links(&links);
        assert_eq!(promising.len(), 1);
        assert_eq!(promising[0].link.href, "https://ir.acme.com/quarterly-results");
    }

    #[test]
    fn score_accumulates_across_fields() {
        let anchor = RawAnchor::new("/investors/quarterly-results", "Quarterly Results");
        let link = document_link_from_anchor(&anchor, BASE, BASE).unwrap();
        // html, text (spaces to dashes) and url each contain the keyword once
        assert_eq!(navigation_score(&link, &["quarterly-result"]), 3);
    }

    #[test]
    fn duplicate_navigation_urls_take_one_slot() {
        let settings = CrawlSettings {
            max_promising_links: 2,
            ..CrawlSettings::default()
        };
        let c = crawler(Arc::new(FakeRenderer::default()), settings);
        let links: Vec<DocumentLink> = [
            RawAnchor::new("/results", "Q3 results"),
            RawAnchor::new("/results", "Quarterly results Q3 10-Q"),
            RawAnchor::new("/sec-filings", "10-K filings"),
        ]
        .iter()
        .filter_map(|a| document_link_from_anchor(a, BASE, BASE))
        .collect();

        let promising = c.promising_links(&links);
        let hrefs: Vec<_> = promising.iter().map(|p| p.link.href.as_str()).collect();
        assert_eq!(hrefs, vec!["https://ir.acme.com/results", "https://ir.acme.com/sec-filings"]);
    }
}
