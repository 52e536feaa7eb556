//! Crawl orchestration.
//!
//! The crawler owns the [`Frontier`] and is its only writer. Each round takes
//! up to `workers` pending tasks, navigates and audits them concurrently, then
//! applies the results one by one in dequeue order: store the report, mark the
//! page visited, enqueue its links, file an issue. Applying in dequeue order
//! gives the same visitation order as a one-page-at-a-time crawl.

use crate::auditor::PageAuditor;
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::frontier::{CrawlTask, EnqueueOutcome, Frontier};
use crate::links::{ExclusionRules, LinkNormalizer};
use crate::report::{PageReport, format_markdown};
use crate::store::{ReportSink, report_key};
use crate::tracker::{FilingOutcome, IssueDeduplicator, IssueTracker};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use wayfinder_scanner::{AuditEngine, PageLoader};

/// One row of the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOutcome {
    pub url: Url,
    pub path: String,
    pub depth: i32,
    /// Real violations retained after impact filtering.
    pub violations: usize,
    pub audit_failed: bool,
    pub report_key: String,
    /// False when the report could not be written.
    pub stored: bool,
    pub filing: FilingOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub run_id: Uuid,
    pub base_url: Url,
    pub max_depth: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Pages in the order they were audited.
    pub pages: Vec<PageOutcome>,
}

impl CrawlSummary {
    pub fn pages_audited(&self) -> usize {
        self.pages.len()
    }

    pub fn total_violations(&self) -> usize {
        self.pages.iter().map(|p| p.violations).sum()
    }

    pub fn audit_failures(&self) -> usize {
        self.pages.iter().filter(|p| p.audit_failed).count()
    }

    pub fn issues_created(&self) -> usize {
        self.count_filings(|f| matches!(f, FilingOutcome::Created { .. }))
    }

    pub fn issues_skipped(&self) -> usize {
        self.count_filings(|f| matches!(f, FilingOutcome::Skipped))
    }

    pub fn issues_failed(&self) -> usize {
        self.count_filings(|f| matches!(f, FilingOutcome::Failed { .. }))
    }

    pub fn store_failures(&self) -> usize {
        self.pages.iter().filter(|p| !p.stored).count()
    }

    /// Audited paths, in audit order.
    pub fn paths(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.path.as_str()).collect()
    }

    fn count_filings(&self, pred: impl Fn(&FilingOutcome) -> bool) -> usize {
        self.pages.iter().filter(|p| pred(&p.filing)).count()
    }
}

/// Invoked once for every finished page.
pub type PageProgressCallback = Arc<dyn Fn(&PageOutcome) + Send + Sync>;

/// Result of navigating and auditing one task, before it is applied to the frontier.
#[derive(Debug)]
pub struct AuditedPage {
    pub report: PageReport,
    /// Raw hrefs in document order; empty when navigation failed.
    pub hrefs: Vec<String>,
}

/// Navigate to a task's URL and audit it. Navigation failures become an `audit-failed` report.
pub async fn audit_page<L, E>(loader: &L, auditor: &PageAuditor<E>, task: &CrawlTask) -> AuditedPage
where
    L: PageLoader,
    E: AuditEngine<L::Page>,
{
    match loader.navigate(&task.url).await {
        Ok(page) => {
            let violations = auditor.audit(&page).await;
            let hrefs = loader.extract_links(&page);
            AuditedPage {
                report: PageReport::new(task.url.clone(), task.depth, violations),
                hrefs,
            }
        }
        Err(e) => {
            warn!("Could not load {}: {}", task.url, e);
            AuditedPage {
                report: PageReport::new(
                    task.url.clone(),
                    task.depth,
                    PageAuditor::<E>::failed(&e.to_string()),
                ),
                hrefs: Vec::new(),
            }
        }
    }
}

pub struct SiteCrawler<L, E, S, T> {
    config: CrawlConfig,
    loader: L,
    auditor: PageAuditor<E>,
    store: S,
    issues: IssueDeduplicator<T>,
    progress: Option<PageProgressCallback>,
}

impl<L, E, S, T> SiteCrawler<L, E, S, T>
where
    L: PageLoader,
    E: AuditEngine<L::Page>,
    S: ReportSink,
    T: IssueTracker,
{
    pub fn new(config: CrawlConfig, loader: L, engine: E, store: S, tracker: T) -> Self {
        let auditor = PageAuditor::new(engine, config.impact_filter.clone(), config.audit_timeout);
        let issues = IssueDeduplicator::new(tracker, config.issue_labels.clone());

        Self {
            config,
            loader,
            auditor,
            store,
            issues,
            progress: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: PageProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tracker(&self) -> &T {
        self.issues.tracker()
    }

    /// Crawl the site once, starting from the base URL.
    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Starting crawl {} of {} (max depth {}, {} worker(s))",
            run_id, self.config.base_url, self.config.max_depth, self.config.workers
        );

        let exclusions = ExclusionRules::new(&self.config.exclusions);
        let normalizer = LinkNormalizer::new(self.config.base_url.clone(), exclusions.clone());
        let mut frontier = Frontier::new(exclusions);

        let seeded = frontier.enqueue(self.config.base_url.clone(), self.config.max_depth);
        if seeded != EnqueueOutcome::Queued {
            warn!("Base URL {} was not queued: {:?}", self.config.base_url, seeded);
        }

        let mut pages = Vec::new();
        while !frontier.is_exhausted() {
            let batch = frontier.dequeue_batch(self.config.workers);

            let audited: Vec<(CrawlTask, AuditedPage)> = stream::iter(batch)
                .map(|task| async move {
                    let page = audit_page(&self.loader, &self.auditor, &task).await;
                    (task, page)
                })
                .buffered(self.config.workers)
                .collect()
                .await;

            for (task, page) in audited {
                let outcome = self.apply(task, page, &mut frontier, &normalizer).await;
                pages.push(outcome);
            }
        }

        let summary = CrawlSummary {
            run_id,
            base_url: self.config.base_url.clone(),
            max_depth: self.config.max_depth,
            started_at,
            finished_at: Utc::now(),
            pages,
        };

        info!(
            "Crawl {} finished: {} page(s), {} violation(s), {} issue(s) opened",
            run_id,
            summary.pages_audited(),
            summary.total_violations(),
            summary.issues_created()
        );

        Ok(summary)
    }

    async fn apply(
        &self,
        task: CrawlTask,
        page: AuditedPage,
        frontier: &mut Frontier,
        normalizer: &LinkNormalizer,
    ) -> PageOutcome {
        let AuditedPage { report, hrefs } = page;
        let key = report_key(&task.url);

        let stored = match self.store.write(&key, &format_markdown(&report)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not store report for {}: {}", task.url, e);
                false
            }
        };

        frontier.mark_visited(&task.url);

        if task.depth > 0 {
            for link in normalizer.crawlable_links(&hrefs, frontier) {
                match frontier.enqueue(link.clone(), task.depth - 1) {
                    EnqueueOutcome::Queued => {}
                    other => debug!("Not queueing {}: {:?}", link, other),
                }
            }
        }

        let filing = self.issues.file(&report).await;

        let outcome = PageOutcome {
            path: report.path(),
            depth: task.depth,
            violations: report
                .violations
                .iter()
                .filter(|v| !v.is_audit_failure())
                .count(),
            audit_failed: report.audit_failed(),
            report_key: key,
            stored,
            filing,
            url: task.url,
        };

        if let Some(ref callback) = self.progress {
            callback(&outcome);
        }

        outcome
    }
}
