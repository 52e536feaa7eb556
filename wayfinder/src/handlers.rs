use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;
use wayfinder_core::auditor::PageAuditor;
use wayfinder_core::config::{
    CrawlConfig, DEFAULT_EXCLUSIONS, DEFAULT_ISSUE_LABELS, DEFAULT_REPORT_DIR, ImpactFilter,
    parse_base_url,
};
use wayfinder_core::crawl::{PageOutcome, SiteCrawler, audit_page};
use wayfinder_core::frontier::CrawlTask;
use wayfinder_core::github::GitHubTracker;
use wayfinder_core::report::{format_markdown, generate_crawl_report, generate_json_report};
use wayfinder_core::store::{MemoryReportStore, ReportSink};
use wayfinder_core::tracker::{FilingOutcome, IssueTracker, MemoryTracker};
use wayfinder_scanner::{HttpPageLoader, StaticRuleEngine};

// Helper functions for crawl handler

/// Install the log subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Parse an `--impact` list such as `critical,serious`.
pub fn parse_impact_list(list: &str) -> Result<ImpactFilter> {
    Ok(ImpactFilter::parse(list)?)
}

/// Parse one line of an exclusion file. Blank lines and `#` comments yield nothing.
pub fn parse_exclusion_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.to_string())
}

/// Load exclusion patterns from a newline-delimited file
pub fn load_exclusions_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read exclusion file {}", path.display()))?;

    Ok(content.lines().filter_map(parse_exclusion_line).collect())
}

/// Built-in exclusions followed by command line and file patterns, without duplicates.
pub fn collect_exclusions(cli: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut patterns: Vec<String> = DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect();
    patterns.extend(cli.iter().filter_map(|p| parse_exclusion_line(p)));
    if let Some(path) = file {
        patterns.extend(load_exclusions_from_file(path)?);
    }

    let mut unique = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        if !unique.contains(&pattern) {
            unique.push(pattern);
        }
    }
    Ok(unique)
}

/// Expand `~` and environment variables in the report directory.
pub fn resolve_report_dir(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Could not expand report directory '{}'", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Repository to file issues in: the flag, then `GITHUB_REPOSITORY`.
pub fn resolve_repository(flag: Option<&String>) -> Option<String> {
    flag.cloned()
        .or_else(|| std::env::var("GITHUB_REPOSITORY").ok())
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message.to_string());
    spinner
}

fn describe_page(page: &PageOutcome) -> String {
    let status = if page.audit_failed {
        "audit failed".red().to_string()
    } else if page.violations == 0 {
        "ok".green().to_string()
    } else {
        format!("{} violation(s)", page.violations).yellow().to_string()
    };

    let filing = match &page.filing {
        FilingOutcome::Created { number } => format!(" (issue #{} opened)", number),
        FilingOutcome::Skipped => " (issue already open)".to_string(),
        FilingOutcome::Failed { .. } => " (issue not filed)".to_string(),
        FilingOutcome::NotFiled => String::new(),
    };

    format!("{} {}{}", page.path, status, filing)
}

pub async fn handle_crawl(sub_matches: &ArgMatches) {
    init_tracing(sub_matches.get_flag("verbose"));

    if let Err(e) = run_crawl(sub_matches).await {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

async fn run_crawl(sub_matches: &ArgMatches) -> Result<()> {
    let Some(url) = sub_matches.get_one::<Url>("url") else {
        bail!("--url is required");
    };
    let depth = *sub_matches.get_one::<i32>("depth").unwrap_or(&2);
    let workers = *sub_matches.get_one::<usize>("threads").unwrap_or(&4);
    let timeout = *sub_matches.get_one::<u64>("timeout").unwrap_or(&10);
    let audit_timeout = *sub_matches.get_one::<u64>("audit-timeout").unwrap_or(&30);
    let dry_run = sub_matches.get_flag("dry-run");
    let json = sub_matches
        .get_one::<String>("format")
        .is_some_and(|f| f == "json");

    let impact = parse_impact_list(
        sub_matches
            .get_one::<String>("impact")
            .map(String::as_str)
            .unwrap_or("critical,serious"),
    )?;

    let cli_exclusions: Vec<String> = sub_matches
        .get_many::<String>("exclude")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let exclusions = collect_exclusions(
        &cli_exclusions,
        sub_matches
            .get_one::<PathBuf>("exclude-file")
            .map(PathBuf::as_path),
    )?;

    let labels: Vec<String> = match sub_matches.get_many::<String>("label") {
        Some(values) => values.cloned().collect(),
        None => DEFAULT_ISSUE_LABELS.iter().map(|s| s.to_string()).collect(),
    };

    let report_dir = resolve_report_dir(
        sub_matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or(DEFAULT_REPORT_DIR),
    )?;

    let config = CrawlConfig::new(url.as_str(), depth)?
        .with_workers(workers)
        .with_impact_filter(impact)
        .with_exclusions(exclusions)
        .with_issue_labels(labels)
        .with_request_timeout(Duration::from_secs(timeout))
        .with_audit_timeout(Duration::from_secs(audit_timeout))
        .with_report_dir(report_dir);
    config.validate()?;

    let repository = resolve_repository(sub_matches.get_one::<String>("repo"));
    let tracker: Box<dyn IssueTracker> = match (&repository, dry_run) {
        (Some(repo), false) => {
            info!("Filing issues in {}", repo);
            Box::new(GitHubTracker::new(repo)?)
        }
        _ => Box::new(MemoryTracker::new()),
    };
    let store: Box<dyn ReportSink> = if dry_run {
        Box::new(MemoryReportStore::new())
    } else {
        Box::new(config.report_store())
    };

    if !json {
        print_divider();
        println!("🧭 Crawling {}", config.base_url);
        println!("Max depth: {}", config.max_depth);
        println!("Workers: {}", config.workers);
        println!("Impact: {}", config.impact_filter);
        println!("Excluding: {}", config.exclusions.join(", "));
        if dry_run {
            println!("Reports: {}", "not written (dry run)".dimmed());
        } else {
            println!("Reports: {}", config.report_dir.display());
        }
        match (&repository, dry_run) {
            (Some(repo), false) => println!("Issues: github.com/{}", repo),
            _ => println!("Issues: {}", "in-memory only".dimmed()),
        }
        print_divider();
    }

    let loader = config.page_loader()?;
    let progress = spinner("Starting crawl...");
    let bar = progress.clone();
    let callback = Arc::new(move |page: &PageOutcome| {
        bar.println(format!("  {}", describe_page(page)));
        bar.set_message(format!("Audited {}", page.path));
    });

    let crawler = SiteCrawler::new(config, loader, StaticRuleEngine::new(), store, tracker)
        .with_progress_callback(callback);
    let summary = crawler.run().await;
    progress.finish_and_clear();
    let summary = summary?;

    if json {
        println!("{}", generate_json_report(&summary)?);
    } else {
        println!("\n✓ Crawl complete!\n");
        print!("{}", generate_crawl_report(&summary));
    }

    Ok(())
}

pub async fn handle_audit(sub_matches: &ArgMatches) {
    init_tracing(false);

    if let Err(e) = run_audit(sub_matches).await {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

async fn run_audit(sub_matches: &ArgMatches) -> Result<()> {
    let Some(url) = sub_matches.get_one::<Url>("url") else {
        bail!("--url is required");
    };
    let timeout = *sub_matches.get_one::<u64>("timeout").unwrap_or(&10);
    let audit_timeout = *sub_matches.get_one::<u64>("audit-timeout").unwrap_or(&30);
    let impact = parse_impact_list(
        sub_matches
            .get_one::<String>("impact")
            .map(String::as_str)
            .unwrap_or("critical,serious"),
    )?;

    let url = parse_base_url(url.as_str())?;
    let loader = HttpPageLoader::new(timeout)?;
    let auditor = PageAuditor::new(
        StaticRuleEngine::new(),
        impact,
        Duration::from_secs(audit_timeout),
    );

    let progress = spinner(&format!("Auditing {}", url));
    let page = audit_page(&loader, &auditor, &CrawlTask { url, depth: 0 }).await;
    progress.finish_and_clear();

    println!("{}", format_markdown(&page.report));
    Ok(())
}
