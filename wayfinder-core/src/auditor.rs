// Adapter between the crawl loop and the accessibility engine

use crate::config::ImpactFilter;
use std::time::Duration;
use tracing::warn;
use wayfinder_scanner::{AuditEngine, Violation};

/// Runs the engine under a timeout and applies the impact filter.
///
/// Never fails: engine errors and timeouts become a single `audit-failed`
/// violation so the page still produces a report.
pub struct PageAuditor<E> {
    engine: E,
    impact_filter: ImpactFilter,
    timeout: Duration,
}

impl<E> PageAuditor<E> {
    pub fn new(engine: E, impact_filter: ImpactFilter, timeout: Duration) -> Self {
        Self {
            engine,
            impact_filter,
            timeout,
        }
    }

    pub fn impact_filter(&self) -> &ImpactFilter {
        &self.impact_filter
    }

    pub async fn audit<P>(&self, page: &P) -> Vec<Violation>
    where
        P: Send + Sync,
        E: AuditEngine<P>,
    {
        match tokio::time::timeout(self.timeout, self.engine.audit(page)).await {
            Ok(Ok(violations)) => violations
                .into_iter()
                .filter(|v| self.impact_filter.allows(v.impact))
                .collect(),
            Ok(Err(e)) => {
                warn!("Audit failed: {}", e);
                Self::failed(&e.to_string())
            }
            Err(_) => {
                warn!("Audit timed out after {:?}", self.timeout);
                Self::failed(&format!("audit timed out after {}s", self.timeout.as_secs()))
            }
        }
    }

    /// The placeholder result for a page that could not be audited.
    pub fn failed(reason: &str) -> Vec<Violation> {
        vec![Violation::audit_failed(reason)]
    }
}
