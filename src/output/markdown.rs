//! Markdown summary generation
//!
//! This module renders a crawl summary as a human-readable markdown report,
//! including overall statistics, the per-depth breakdown and every page.

use crate::output::CrawlSummary;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for one or more crawls to disk
///
/// # Arguments
///
/// * `summaries` - One summary per crawled seed, in crawl order
/// * `output_path` - Path where the markdown file should be written
/// * `generated_at` - Timestamp printed in each report header
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(CrawlError)` - Failed to write summary
pub fn write_markdown_summary(
    summaries: &[CrawlSummary],
    output_path: &Path,
    generated_at: DateTime<Utc>,
) -> crate::Result<()> {
    let markdown = summaries
        .iter()
        .map(|summary| format_markdown_summary(summary, generated_at))
        .collect::<Vec<_>>()
        .join("---\n\n");

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary, generated_at: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str("# Depth-Ripple Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", summary.seed_url));
    md.push_str(&format!("- **Backend**: {}\n", summary.backend));
    md.push_str(&format!(
        "- **Generated**: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "- **Status**: {}\n\n",
        if summary.cancelled {
            "cancelled"
        } else {
            "completed"
        }
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", summary.total_pages));
    md.push_str(&format!(
        "- **Successful Pages**: {}\n",
        summary.successful_pages
    ));
    md.push_str(&format!("- **Failed Pages**: {}\n", summary.failed_pages()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!(
        "- **Max Depth Reached**: {}\n",
        summary.max_depth_reached
    ));
    md.push_str(&format!(
        "- **Total Content**: {} characters\n",
        summary.total_content_length
    ));
    md.push_str(&format!(
        "- **Total Fetch Time**: {:.2} seconds\n\n",
        summary.total_duration
    ));

    if !summary.per_depth_counts.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &summary.per_depth_counts {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');

        md.push_str("## Pages\n\n");
        for depth in summary.per_depth_counts.keys() {
            md.push_str(&format!("### Depth {}\n\n", depth));
            md.push_str("| URL | Title | Result | Characters | Time (s) |\n");
            md.push_str("|-----|-------|--------|------------|----------|\n");

            for result in summary.results_at(*depth) {
                let outcome = match &result.error {
                    Some(error) => format!("failed: {}", escape_cell(error)),
                    None => "ok".to_string(),
                };
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {:.2} |\n",
                    result.url,
                    escape_cell(result.display_title()),
                    outcome,
                    result.content_length,
                    result.duration
                ));
            }
            md.push('\n');
        }
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
