pub mod company;
pub mod document_link;
pub mod fiscal_period;
pub mod frontier;
pub mod loaders;
pub mod report;
pub mod run_record;

pub use company::Company;
pub use document_link::{DocumentLink, LinkType};
pub use fiscal_period::{FiscalPeriod, PeriodSignal};
pub use frontier::{CrawlFrontier, LinkSet};
pub use loaders::{filter_roster, load_roster};
pub use report::{ExtractedReport, ReportTarget};
pub use run_record::{CompanyRun, DownloadedFile, RunStatus};
