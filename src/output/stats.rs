//! Console reporting of crawl results

use crate::output::CrawlSummary;

/// Prints a crawl summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary: {} ===\n", summary.seed_url);

    println!("Overview:");
    println!("  Backend: {}", summary.backend);
    println!("  Max depth reached: {}", summary.max_depth_reached);
    println!("  Total pages crawled: {}", summary.total_pages);
    println!("  Successful pages: {}", summary.successful_pages);
    println!("  Total content: {} characters", summary.total_content_length);
    println!(
        "  Total fetch time: {:.2}s (avg {:.2}s/page)",
        summary.total_duration,
        summary.average_duration()
    );
    if summary.cancelled {
        println!("  Run was cancelled; results are partial");
    }
    println!();

    println!("Pages by Depth:");
    for (depth, count) in &summary.per_depth_counts {
        println!("  Depth {}: {} pages", depth, count);
    }
    println!();

    for depth in summary.per_depth_counts.keys() {
        println!("Depth {}:", depth);
        for result in summary.results_at(*depth) {
            println!("  {}", depth_line(result));
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched successfully)",
        summary.success_rate(),
        summary.successful_pages,
        summary.total_pages
    );
}

fn depth_line(result: &crate::state::PageResult) -> String {
    if result.success {
        format!(
            "✓ {} ({} chars, {:.2}s)\n    {}",
            result.display_title(),
            result.content_length,
            result.duration,
            result.url
        )
    } else {
        format!(
            "✗ {}\n    {}",
            result.url,
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}
