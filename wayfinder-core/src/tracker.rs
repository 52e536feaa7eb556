//! Issue filing with read-before-write deduplication.
//!
//! Each page maps to exactly one issue title, `Accessibility issues on <path>`.
//! Before filing, the tracker is asked whether an open issue with that exact
//! title exists; only when the lookup succeeds and finds nothing is a new issue
//! created. Lookup and creation failures are recorded per page and never abort
//! the crawl.

use crate::error::TrackerError;
use crate::report::{PageReport, format_markdown};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

pub const ISSUE_TITLE_PREFIX: &str = "Accessibility issues on ";

/// GitHub rejects issue bodies above 65536 characters.
pub const MAX_ISSUE_BODY_CHARS: usize = 65_000;

const TRUNCATION_NOTE: &str = "\n\n_Report truncated. See the stored report artifact for the full list._";

/// Deterministic issue title for a page path; doubles as the dedup key.
pub fn issue_title(path: &str) -> String {
    format!("{}{}", ISSUE_TITLE_PREFIX, path)
}

/// Hidden marker embedded in issue bodies to identify the page.
pub fn page_marker(path: &str) -> String {
    format!("<!-- wayfinder:page={} -->", path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

impl Issue {
    pub fn for_report(report: &PageReport, labels: &[String]) -> Self {
        let path = report.path();
        let marker = page_marker(&path);
        let mut body = format_markdown(report);

        let budget = MAX_ISSUE_BODY_CHARS.saturating_sub(marker.len() + TRUNCATION_NOTE.len() + 2);
        if body.chars().count() > budget {
            body = body.chars().take(budget).collect();
            body.push_str(TRUNCATION_NOTE);
        }
        body.push_str("\n\n");
        body.push_str(&marker);

        Self {
            title: issue_title(&path),
            body,
            labels: labels.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub number: u64,
    #[serde(default, rename = "html_url")]
    pub url: Option<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Whether an open issue with exactly this title exists.
    async fn find_open_issue(&self, title: &str) -> Result<bool, TrackerError>;

    async fn create_issue(&self, issue: &Issue) -> Result<CreatedIssue, TrackerError>;
}

#[async_trait]
impl<T: IssueTracker + ?Sized> IssueTracker for Box<T> {
    async fn find_open_issue(&self, title: &str) -> Result<bool, TrackerError> {
        (**self).find_open_issue(title).await
    }

    async fn create_issue(&self, issue: &Issue) -> Result<CreatedIssue, TrackerError> {
        (**self).create_issue(issue).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FilingOutcome {
    Created { number: u64 },
    /// An open issue for the page already exists.
    Skipped,
    Failed { reason: String },
    /// Nothing to file: no real violations on the page.
    NotFiled,
}

pub struct IssueDeduplicator<T> {
    tracker: T,
    labels: Vec<String>,
}

impl<T: IssueTracker> IssueDeduplicator<T> {
    pub fn new(tracker: T, labels: Vec<String>) -> Self {
        Self { tracker, labels }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub async fn file(&self, report: &PageReport) -> FilingOutcome {
        if !report.has_findings() {
            return FilingOutcome::NotFiled;
        }

        let issue = Issue::for_report(report, &self.labels);

        match self.tracker.find_open_issue(&issue.title).await {
            Ok(true) => {
                info!("Skipped '{}': an open issue already exists", issue.title);
                return FilingOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Could not check for an existing '{}': {}", issue.title, e);
                return FilingOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        }

        match self.tracker.create_issue(&issue).await {
            Ok(created) => {
                info!("Opened issue #{} '{}'", created.number, issue.title);
                FilingOutcome::Created {
                    number: created.number,
                }
            }
            Err(e) => {
                warn!("Failed to open '{}': {}", issue.title, e);
                FilingOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub open: bool,
}

/// In-process tracker. Nothing leaves the process; issues live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    issues: Mutex<Vec<TrackedIssue>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<TrackedIssue> {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn open_issues(&self) -> Vec<TrackedIssue> {
        self.issues().into_iter().filter(|i| i.open).collect()
    }

    /// Close an issue by number. Returns false when no such issue exists.
    pub fn close(&self, number: u64) -> bool {
        let mut issues = self.issues.lock().unwrap_or_else(PoisonError::into_inner);
        match issues.iter_mut().find(|i| i.number == number) {
            Some(issue) => {
                issue.open = false;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl IssueTracker for MemoryTracker {
    async fn find_open_issue(&self, title: &str) -> Result<bool, TrackerError> {
        let issues = self.issues.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(issues.iter().any(|i| i.open && i.title == title))
    }

    async fn create_issue(&self, issue: &Issue) -> Result<CreatedIssue, TrackerError> {
        let mut issues = self.issues.lock().unwrap_or_else(PoisonError::into_inner);
        let number = issues.len() as u64 + 1;
        issues.push(TrackedIssue {
            number,
            title: issue.title.clone(),
            body: issue.body.clone(),
            labels: issue.labels.clone(),
            open: true,
        });
        Ok(CreatedIssue { number, url: None })
    }
}
