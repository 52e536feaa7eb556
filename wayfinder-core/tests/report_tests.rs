// Tests for report formatting

use chrono::Utc;
use url::Url;
use uuid::Uuid;
use wayfinder_core::crawl::{CrawlSummary, PageOutcome};
use wayfinder_core::report::{
    NO_VIOLATIONS, PageReport, format_markdown, generate_crawl_report, generate_json_report,
    page_path,
};
use wayfinder_core::tracker::FilingOutcome;
use wayfinder_scanner::{Impact, Violation};

fn report(path: &str, violations: Vec<Violation>) -> PageReport {
    let url = Url::parse("https://example.com").unwrap().join(path).unwrap();
    PageReport::new(url, 1, violations)
}

fn outcome(path: &str, violations: usize, filing: FilingOutcome) -> PageOutcome {
    PageOutcome {
        url: Url::parse("https://example.com").unwrap().join(path).unwrap(),
        path: path.to_string(),
        depth: 1,
        violations,
        audit_failed: false,
        report_key: "a11y-home.md".to_string(),
        stored: true,
        filing,
    }
}

fn summary(pages: Vec<PageOutcome>) -> CrawlSummary {
    CrawlSummary {
        run_id: Uuid::new_v4(),
        base_url: Url::parse("https://example.com/").unwrap(),
        max_depth: 2,
        started_at: Utc::now(),
        finished_at: Utc::now(),
        pages,
    }
}

// ============================================================================
// Markdown formatting
// ============================================================================

#[test]
fn test_empty_report_is_sentinel() {
    assert_eq!(format_markdown(&report("/", vec![])), NO_VIOLATIONS);
    assert_eq!(NO_VIOLATIONS, "No accessibility violations found.");
}

#[test]
fn test_violations_keep_engine_order() {
    let md = format_markdown(&report(
        "/contact",
        vec![
            Violation::new("label", Impact::Critical, "Form elements must have labels"),
            Violation::new("image-alt", Impact::Serious, "Images must have alt text"),
        ],
    ));

    assert!(md.starts_with("# Accessibility report for /contact"));
    let label = md.find("## label (critical)").unwrap();
    let image = md.find("## image-alt (serious)").unwrap();
    assert!(label < image);
    assert!(md.contains("- Violations: 2"));
}

#[test]
fn test_help_url_and_nodes() {
    let violation = Violation::new("image-alt", Impact::Critical, "Images must have alt text")
        .with_help_url("https://dequeuniversity.com/rules/axe/4.10/image-alt")
        .with_node("<img src=\"a.png\">")
        .with_node("<img\n   src=\"b.png\">");

    let md = format_markdown(&report("/", vec![violation]));
    assert!(md.contains("Help: <https://dequeuniversity.com/rules/axe/4.10/image-alt>"));
    assert!(md.contains("- `<img src=\"a.png\">`"));
    assert!(md.contains("- `<img src=\"b.png\">`"));
}

#[test]
fn test_backticks_in_snippet_are_fenced() {
    let violation =
        Violation::new("label", Impact::Critical, "x").with_node("<input value=\"`code`\">");
    let md = format_markdown(&report("/", vec![violation]));
    assert!(md.contains("- `` <input value=\"`code`\"> ``"));
}

#[test]
fn test_audit_failure_is_rendered() {
    let md = format_markdown(&report("/", vec![Violation::audit_failed("timed out")]));
    assert!(md.contains("## audit-failed (critical)"));
    assert!(md.contains("timed out"));
}

#[test]
fn test_page_path() {
    assert_eq!(page_path(&Url::parse("https://example.com").unwrap()), "/");
    assert_eq!(
        page_path(&Url::parse("https://example.com/a/b?x=1").unwrap()),
        "/a/b"
    );
}

#[test]
fn test_findings_ignore_audit_failure() {
    assert!(!report("/", vec![]).has_findings());
    let failed = report("/", vec![Violation::audit_failed("boom")]);
    assert!(!failed.has_findings());
    assert!(failed.audit_failed());
    assert!(report("/", vec![Violation::new("label", Impact::Critical, "x")]).has_findings());
}

// ============================================================================
// Run summaries
// ============================================================================

#[test]
fn test_crawl_report_lists_pages() {
    let text = generate_crawl_report(&summary(vec![
        outcome("/", 0, FilingOutcome::NotFiled),
        outcome("/contact", 2, FilingOutcome::Created { number: 7 }),
        outcome("/about", 1, FilingOutcome::Skipped),
    ]));

    assert!(text.contains("Pages audited: 3"));
    assert!(text.contains("Total violations: 3"));
    assert!(text.contains("Issues: 1 created, 1 already open, 0 failed"));
    assert!(text.contains("/contact  2 violation(s)"));
    assert!(text.contains("issue #7 opened"));
    assert!(text.contains("issue already open"));
}

#[test]
fn test_json_report_is_valid() {
    let json = generate_json_report(&summary(vec![outcome(
        "/contact",
        1,
        FilingOutcome::Failed {
            reason: "rate limited".to_string(),
        },
    )]))
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let report = &value["report"];
    assert_eq!(report["summary"]["pages_audited"], 1);
    assert_eq!(report["summary"]["issues_failed"], 1);
    assert_eq!(report["pages"][0]["path"], "/contact");
    assert_eq!(report["pages"][0]["filing"]["status"], "failed");
    assert_eq!(report["pages"][0]["filing"]["reason"], "rate limited");
}
