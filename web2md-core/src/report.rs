// Final crawl report rendering

use crate::crawl::extract_url_path;
use colored::Colorize;
use web2md_scanner::{CrawlSummary, PageOutcome, PageResult};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

fn outcome_marker(outcome: PageOutcome) -> String {
    match outcome {
        PageOutcome::Saved => "✓".green().bold().to_string(),
        PageOutcome::SkippedEmpty => "∅".yellow().to_string(),
        PageOutcome::SkippedLimit => "…".bright_black().to_string(),
        PageOutcome::Failed => "✗".red().bold().to_string(),
    }
}

fn page_line(page: &PageResult) -> String {
    let mut line = format!("  {} {}", outcome_marker(page.outcome), extract_url_path(&page.url));

    match page.outcome {
        PageOutcome::Saved => {
            if let Some(ref path) = page.output_path {
                line.push_str(&format!(" {} {}", "→".blue(), path.display()));
            }
            if page.media_saved > 0 {
                line.push_str(&format!(" ({} media)", page.media_saved));
            }
        }
        PageOutcome::SkippedEmpty => line.push_str(&format!(" {}", "no content".bright_black())),
        PageOutcome::SkippedLimit => line.push_str(&format!(" {}", "page limit".bright_black())),
        PageOutcome::Failed => {
            if let Some(ref error) = page.error {
                line.push_str(&format!(" {}", error.red()));
            }
        }
    }

    line
}

/// Human-readable report of a finished crawl
pub fn generate_text_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Target: {}\n", summary.target));
    report.push_str(&format!("  Scope root: {}\n", summary.base_url));
    report.push_str(&format!("  Output directory: {}\n", summary.output_root.display()));
    report.push_str(&format!("  Pages saved: {}\n", summary.saved));
    report.push_str(&format!(
        "  Pages skipped: {}\n",
        summary.count(PageOutcome::SkippedEmpty) + summary.count(PageOutcome::SkippedLimit)
    ));
    report.push_str(&format!("  Pages failed: {}\n", summary.count(PageOutcome::Failed)));
    report.push_str(&format!("  Media files saved: {}\n", summary.media_saved()));
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    if summary.pages.is_empty() {
        report.push_str("  No pages were crawled.\n");
        return report;
    }

    report.push_str(&format!("## {}\n", summary.base_url));
    report.push_str(&format!("  {} pages dispatched\n\n", summary.pages.len()));
    for page in &summary.pages {
        report.push_str(&page_line(page));
        report.push('\n');
    }
    report.push('\n');

    report
}

pub fn generate_json_report(summary: &CrawlSummary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "web2md",
                "version": env!("CARGO_PKG_VERSION"),
                "format": "json",
            },
            "crawl": {
                "target": summary.target,
                "base_url": summary.base_url,
                "output_dir": summary.output_root,
            },
            "summary": {
                "pages_saved": summary.saved,
                "pages_skipped_empty": summary.count(PageOutcome::SkippedEmpty),
                "pages_skipped_limit": summary.count(PageOutcome::SkippedLimit),
                "pages_failed": summary.count(PageOutcome::Failed),
                "media_saved": summary.media_saved(),
            },
            "pages": summary.pages,
        }
    });

    serde_json::to_string_pretty(&json_report)
}
