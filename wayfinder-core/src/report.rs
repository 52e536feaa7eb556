// Page reports and run summaries

use crate::crawl::CrawlSummary;
use crate::tracker::FilingOutcome;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use wayfinder_scanner::Violation;

/// Rendered in place of a report body when a page has no violations.
pub const NO_VIOLATIONS: &str = "No accessibility violations found.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub url: Url,
    /// Remaining hop budget when the page was audited.
    pub depth: i32,
    pub violations: Vec<Violation>,
    pub generated_at: DateTime<Utc>,
}

impl PageReport {
    pub fn new(url: Url, depth: i32, violations: Vec<Violation>) -> Self {
        Self {
            url,
            depth,
            violations,
            generated_at: Utc::now(),
        }
    }

    pub fn path(&self) -> String {
        page_path(&self.url)
    }

    /// True when the page was audited and at least one real violation was found.
    pub fn has_findings(&self) -> bool {
        self.violations.iter().any(|v| !v.is_audit_failure())
    }

    pub fn audit_failed(&self) -> bool {
        self.violations.iter().any(Violation::is_audit_failure)
    }
}

/// Path component of a page URL; the root is always `/`.
pub fn page_path(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Render a page report as markdown, violations in the order supplied.
pub fn format_markdown(report: &PageReport) -> String {
    if report.violations.is_empty() {
        return NO_VIOLATIONS.to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("# Accessibility report for {}\n\n", report.path()));
    out.push_str(&format!("- Page: {}\n", report.url));
    out.push_str(&format!(
        "- Generated: {}\n",
        report.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!("- Violations: {}\n", report.violations.len()));

    for violation in &report.violations {
        out.push_str(&format!(
            "\n## {} ({})\n\n",
            violation.rule_id, violation.impact
        ));
        out.push_str(violation.description.trim());
        out.push('\n');

        if !violation.help_url.is_empty() {
            out.push_str(&format!("\nHelp: <{}>\n", violation.help_url));
        }

        if !violation.nodes.is_empty() {
            out.push_str("\nAffected nodes:\n\n");
            for node in &violation.nodes {
                out.push_str(&format!("- {}\n", inline_code(node)));
            }
        }
    }

    out
}

/// Inline code span that survives backticks and line breaks in the snippet.
fn inline_code(snippet: &str) -> String {
    let flat = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return "(empty snippet)".to_string();
    }

    let mut longest = 0;
    let mut run = 0;
    for c in flat.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    if longest == 0 {
        return format!("`{}`", flat);
    }
    let fence = "`".repeat(longest + 1);
    format!("{} {} {}", fence, flat, fence)
}

/// Plain-text summary of a crawl run for the terminal.
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Site: {}\n", summary.base_url));
    report.push_str(&format!("  Run: {}\n", summary.run_id));
    report.push_str(&format!("  Max depth: {}\n", summary.max_depth));
    report.push_str(&format!("  Pages audited: {}\n", summary.pages_audited()));
    report.push_str(&format!("  Total violations: {}\n", summary.total_violations()));
    report.push_str(&format!("  Audit failures: {}\n", summary.audit_failures()));
    report.push_str(&format!(
        "  Issues: {} created, {} already open, {} failed\n",
        summary.issues_created(),
        summary.issues_skipped(),
        summary.issues_failed()
    ));
    if summary.store_failures() > 0 {
        report.push_str(&format!(
            "  Reports not written: {}\n",
            summary.store_failures()
        ));
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("## Pages\n");

    for page in &summary.pages {
        let status = if page.audit_failed {
            "FAILED".to_string()
        } else if page.violations == 0 {
            "ok".to_string()
        } else {
            format!("{} violation(s)", page.violations)
        };

        let filing = match &page.filing {
            FilingOutcome::Created { number } => format!("  issue #{} opened", number),
            FilingOutcome::Skipped => "  issue already open".to_string(),
            FilingOutcome::Failed { reason } => format!("  issue not filed: {}", reason),
            FilingOutcome::NotFiled => String::new(),
        };

        report.push_str(&format!(
            "  [{}] {}  {}  -> {}{}\n",
            page.depth, page.path, status, page.report_key, filing
        ));
    }
    report.push('\n');

    report
}

pub fn generate_json_report(summary: &CrawlSummary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Wayfinder",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": Utc::now().to_rfc3339(),
            },
            "run": {
                "id": summary.run_id,
                "base_url": summary.base_url,
                "max_depth": summary.max_depth,
                "started_at": summary.started_at,
                "finished_at": summary.finished_at,
            },
            "summary": {
                "pages_audited": summary.pages_audited(),
                "total_violations": summary.total_violations(),
                "audit_failures": summary.audit_failures(),
                "issues_created": summary.issues_created(),
                "issues_skipped": summary.issues_skipped(),
                "issues_failed": summary.issues_failed(),
            },
            "pages": summary.pages,
        }
    });

    serde_json::to_string_pretty(&json_report)
}
