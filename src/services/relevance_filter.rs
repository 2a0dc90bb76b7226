//! Quarterly relevance filter
//!
//! Ranking and filtering treat a missing quarter differently: ranking
//! assumes Q4 so an undated link never lowers the bar, filtering keeps the
//! link because a missing date is not evidence of staleness.

use crate::models::{DocumentLink, FiscalPeriod};
use crate::services::period_extractor::PeriodExtractor;

/// The latest (year, quarter) signalled by any link.
///
/// Falls back to Q4 of the current year when no link carries a year.
pub fn find_latest_period<'a, I>(links: I, extractor: &PeriodExtractor) -> FiscalPeriod
where
    I: IntoIterator<Item = &'a DocumentLink>,
{
    links
        .into_iter()
        .filter_map(|link| extractor.extract_link(link).ranked())
        .max()
        .unwrap_or_else(|| FiscalPeriod::year_end(extractor.current_year()))
}

/// Whether `link` belongs to `latest` or a later period
pub fn is_relevant(link: &DocumentLink, latest: FiscalPeriod, extractor: &PeriodExtractor) -> bool {
    let signal = extractor.extract_link(link);
    let year = match signal.year {
        Some(year) => year,
        None => return true,
    };

    if year != latest.year {
        return year > latest.year;
    }
    match signal.quarter {
        Some(quarter) => quarter >= latest.quarter,
        None => true,
    }
}

/// Keep only the documents of the latest period, returning that period too
pub fn retain_latest(documents: Vec<DocumentLink>, extractor: &PeriodExtractor) -> (FiscalPeriod, Vec<DocumentLink>) {
    let latest = find_latest_period(&documents, extractor);
    let relevant = documents
        .into_iter()
        .filter(|link| is_relevant(link, latest, extractor))
        .collect();
    (latest, relevant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkType;

    fn doc(text: &str, path: &str) -> DocumentLink {
        DocumentLink::new(
            format!("https://ir.example.com/{}", path),
            text,
            "",
            LinkType::Document,
            "https://ir.example.com/",
            "",
        )
    }

    #[test]
    fn latest_period_uses_q4_for_year_only_links() {
        let ex = PeriodExtractor::new(2025);
        let links = vec![
            doc("Q2 2025 press release", "a.pdf"),
            doc("Q2 2025 10-Q", "b.pdf"),
            doc("Q2 2025 slides", "c.pdf"),
            doc("Q4 2025 press release", "d.pdf"),
            doc("FY2026 outlook", "e.pdf"),
        ];

        let latest = find_latest_period(&links, &ex);
        assert_eq!(latest, FiscalPeriod::new(2026, 4));

        let (_, kept) = retain_latest(links, &ex);
        let kept: Vec<_> = kept.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(kept, vec!["FY2026 outlook"]);
    }

    #[test]
    fn defaults_to_current_year_end_without_any_year() {
        let ex = PeriodExtractor::new(2025);
        let links = vec![doc("Annual report", "annual.pdf")];
        assert_eq!(find_latest_period(&links, &ex), FiscalPeriod::new(2025, 4));
        assert_eq!(find_latest_period(&Vec::<DocumentLink>::new(), &ex), FiscalPeriod::new(2025, 4));
    }

    #[test]
    fn undated_documents_are_always_kept() {
        let ex = PeriodExtractor::new(2025);
        let undated = doc("Shareholder letter", "letter.pdf");
        for latest in [FiscalPeriod::new(2025, 1), FiscalPeriod::new(2026, 4)] {
            assert!(is_relevant(&undated, latest, &ex));
        }
    }

    #[test]
    fn same_year_compares_quarter_when_known() {
        let ex = PeriodExtractor::new(2025);
        let latest = FiscalPeriod::new(2025, 3);
        assert!(is_relevant(&doc("Q3 2025 deck", "x.pdf"), latest, &ex));
        assert!(!is_relevant(&doc("Q2 2025 deck", "x.pdf"), latest, &ex));
        assert!(is_relevant(&doc("2025 proxy", "x.pdf"), latest, &ex));
        assert!(is_relevant(&doc("FY26 plan", "x.pdf"), latest, &ex));
    }

    #[test]
    fn stale_two_digit_years_count_as_undated() {
        let ex = PeriodExtractor::new(2025);
        let old = doc("FY19 annual report", "fy19.pdf");
        assert_eq!(find_latest_period([&old], &ex), FiscalPeriod::new(2025, 4));
        assert!(is_relevant(&old, FiscalPeriod::new(2025, 3), &ex));
    }
}
