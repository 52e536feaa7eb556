// Crawl configuration consumed by the orchestrator

use crate::error::ConfigError;
use crate::store::FsReportStore;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use wayfinder_scanner::{HttpPageLoader, Impact, ScanError};

pub const DEFAULT_MAX_DEPTH: i32 = 2;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_AUDIT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REPORT_DIR: &str = "./a11y-reports";
pub const DEFAULT_EXCLUSIONS: &[&str] = &["/logout"];
pub const DEFAULT_ISSUE_LABELS: &[&str] = &["accessibility", "automated"];

/// Severity allow-list applied to engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactFilter {
    allowed: BTreeSet<Impact>,
}

impl ImpactFilter {
    pub fn new<I: IntoIterator<Item = Impact>>(impacts: I) -> Self {
        Self {
            allowed: impacts.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new(Impact::ALL)
    }

    /// Parse a comma separated list such as `critical,serious`.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        let mut allowed = BTreeSet::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let impact = part.parse::<Impact>().map_err(ConfigError::InvalidImpact)?;
            allowed.insert(impact);
        }

        if allowed.is_empty() {
            return Err(ConfigError::EmptyImpactFilter);
        }
        Ok(Self { allowed })
    }

    pub fn allows(&self, impact: Impact) -> bool {
        self.allowed.contains(&impact)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn impacts(&self) -> impl Iterator<Item = Impact> + '_ {
        self.allowed.iter().copied()
    }
}

impl Default for ImpactFilter {
    fn default() -> Self {
        Self::new([Impact::Critical, Impact::Serious])
    }
}

impl std::fmt::Display for ImpactFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.allowed.iter().map(|i| i.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// Options for a single crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Root of the site; also the seed URL.
    pub base_url: Url,
    /// Hop budget from the seed.
    pub max_depth: i32,
    pub impact_filter: ImpactFilter,
    /// Substring patterns; matching links are never crawled.
    pub exclusions: Vec<String>,
    pub issue_labels: Vec<String>,
    /// Pages navigated and audited concurrently.
    pub workers: usize,
    pub request_timeout: Duration,
    pub audit_timeout: Duration,
    pub report_dir: PathBuf,
}

impl CrawlConfig {
    pub fn new(base_url: &str, max_depth: i32) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)?;
        if max_depth < 0 {
            return Err(ConfigError::NegativeDepth(max_depth));
        }

        Ok(Self {
            base_url,
            max_depth,
            impact_filter: ImpactFilter::default(),
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            issue_labels: DEFAULT_ISSUE_LABELS.iter().map(|s| s.to_string()).collect(),
            workers: DEFAULT_WORKERS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            audit_timeout: Duration::from_secs(DEFAULT_AUDIT_TIMEOUT_SECS),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        })
    }

    pub fn with_impact_filter(mut self, filter: ImpactFilter) -> Self {
        self.impact_filter = filter;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_issue_labels(mut self, labels: Vec<String>) -> Self {
        self.issue_labels = labels;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_audit_timeout(mut self, timeout: Duration) -> Self {
        self.audit_timeout = timeout;
        self
    }

    pub fn with_report_dir(mut self, dir: PathBuf) -> Self {
        self.report_dir = dir;
        self
    }

    /// HTTP loader honoring the request timeout. Redirects stay on the base
    /// origin and never land on an excluded path.
    pub fn page_loader(&self) -> Result<HttpPageLoader, ScanError> {
        HttpPageLoader::with_exclusions(self.request_timeout, self.exclusions.clone())
    }

    pub fn report_store(&self) -> FsReportStore {
        FsReportStore::new(&self.report_dir)
    }

    /// Re-check everything the builder methods may have changed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth < 0 {
            return Err(ConfigError::NegativeDepth(self.max_depth));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.impact_filter.is_empty() {
            return Err(ConfigError::EmptyImpactFilter);
        }
        Ok(())
    }
}

/// Parse and normalize the crawl root. Only absolute http(s) URLs with a host
/// are accepted. The query and fragment are dropped since a page is its path.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    url.set_fragment(None);
    url.set_query(None);
    Ok(url)
}
