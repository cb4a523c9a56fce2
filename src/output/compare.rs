//! Side-by-side comparison of crawls of one seed through different backends

use crate::output::CrawlSummary;

/// The standout backends of a comparison
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonHighlights<'a> {
    /// Most pages recorded
    pub best_coverage: &'a CrawlSummary,

    /// Lowest mean fetch time, among runs that recorded anything
    pub fastest_per_page: Option<&'a CrawlSummary>,

    /// Most content characters
    pub most_content: &'a CrawlSummary,
}

/// Picks the standout runs; ties go to the run listed first
///
/// Returns `None` for an empty slice.
pub fn highlights(summaries: &[CrawlSummary]) -> Option<ComparisonHighlights<'_>> {
    let first = summaries.first()?;

    let best_coverage = summaries.iter().fold(first, |best, s| {
        if s.total_pages > best.total_pages {
            s
        } else {
            best
        }
    });
    let most_content = summaries.iter().fold(first, |best, s| {
        if s.total_content_length > best.total_content_length {
            s
        } else {
            best
        }
    });
    let fastest_per_page = summaries
        .iter()
        .filter(|s| s.total_pages > 0)
        .min_by(|a, b| a.average_duration().total_cmp(&b.average_duration()));

    Some(ComparisonHighlights {
        best_coverage,
        fastest_per_page,
        most_content,
    })
}

/// Formats the comparison table and highlights for one seed
pub fn format_comparison(seed_url: &str, summaries: &[CrawlSummary]) -> String {
    let mut out = format!("=== Backend Comparison: {} ===\n\n", seed_url);

    out.push_str(&format!(
        "{:<12} {:>6} {:>9} {:>12} {:>11}\n",
        "Backend", "Pages", "Success%", "Total Chars", "Total Time"
    ));
    out.push_str(&format!("{}\n", "-".repeat(54)));
    for summary in summaries {
        out.push_str(&format!(
            "{:<12} {:>6} {:>8.1}% {:>12} {:>10.1}s{}\n",
            summary.backend,
            summary.total_pages,
            summary.success_rate(),
            summary.total_content_length,
            summary.total_duration,
            if summary.cancelled { " (partial)" } else { "" }
        ));
    }

    if let Some(h) = highlights(summaries) {
        out.push('\n');
        out.push_str(&format!(
            "Best coverage: {} ({} pages)\n",
            h.best_coverage.backend, h.best_coverage.total_pages
        ));
        match h.fastest_per_page {
            Some(fastest) => out.push_str(&format!(
                "Fastest per page: {} ({:.2}s average)\n",
                fastest.backend,
                fastest.average_duration()
            )),
            None => out.push_str("Fastest per page: n/a (no pages recorded)\n"),
        }
        out.push_str(&format!(
            "Most content: {} ({} characters)\n",
            h.most_content.backend, h.most_content.total_content_length
        ));
    }

    out
}

/// Prints the comparison for one seed to stdout
pub fn print_comparison(seed_url: &str, summaries: &[CrawlSummary]) {
    println!("{}", format_comparison(seed_url, summaries));
}
