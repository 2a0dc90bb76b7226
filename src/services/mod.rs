pub mod artifact_writer;
pub mod file_downloader;
pub mod link_classifier;
pub mod metadata_recorder;
pub mod period_extractor;
pub mod relevance_filter;
pub mod report_extractor;
pub mod site_crawler;
pub mod title_resolver;

pub use artifact_writer::ArtifactWriter;
pub use file_downloader::{FileDownloader, HttpDownloader};
pub use link_classifier::{classify, document_link_from_anchor, is_excluded, is_same_domain};
pub use metadata_recorder::RunMetadataRecorder;
pub use period_extractor::PeriodExtractor;
pub use relevance_filter::{find_latest_period, is_relevant};
pub use report_extractor::{LlmReportExtractor, ReportExtractor};
pub use site_crawler::{CrawlOutcome, CrawlSettings, SiteCrawler};
pub use title_resolver::{HttpTitleResolver, TitleResolver};
