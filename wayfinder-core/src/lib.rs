pub mod auditor;
pub mod config;
pub mod crawl;
pub mod error;
pub mod frontier;
pub mod github;
pub mod links;
pub mod report;
pub mod store;
pub mod tracker;

use colored::Colorize;

pub use auditor::PageAuditor;
pub use config::{CrawlConfig, ImpactFilter};
pub use crawl::{CrawlSummary, PageOutcome, PageProgressCallback, SiteCrawler};
pub use error::{ConfigError, CrawlError, StoreError, TrackerError};
pub use frontier::{CrawlTask, EnqueueOutcome, Frontier, PageState};
pub use github::GitHubTracker;
pub use links::{ExclusionRules, LinkClass, LinkNormalizer};
pub use report::{PageReport, format_markdown, generate_crawl_report, generate_json_report};
pub use store::{FsReportStore, MemoryReportStore, ReportSink, report_key};
pub use tracker::{FilingOutcome, IssueDeduplicator, IssueTracker, MemoryTracker};

pub fn print_banner() {
    let banner = r#"
 __      __              _____.__            .___
/  \    /  \_____  ___.__/ ____\__| ____    __| _/___________
\   \/\/   /\__  \<   |  \   __\|  |/    \  / __ |/ __ \_  __ \
 \        /  / __ \\___  ||  |  |  |   |  \/ /_/ \  ___/|  | \/
  \__/\  /  (____  / ____||__|  |__|___|  /\____ |\___  >__|
       \/        \/\/                   \/      \/    \/
"#;
    println!("{}", banner.bright_cyan());
    println!(
        "  {} {}\n",
        "site accessibility crawler".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
