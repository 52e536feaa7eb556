use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;
use wayfinder_core::config::DEFAULT_REPORT_DIR;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("wayfinder")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("wayfinder")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site from its root, audit every reachable page for accessibility \
                violations, write one report per page and open issues for new findings.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Root URL of the site to crawl")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum number of link hops from the root")
                        .value_parser(clap::value_parser!(i32))
                        .default_value("2"),
                )
                .arg(
                    arg!(--"impact" <LEVELS>)
                        .required(false)
                        .help("Comma separated impact levels to report: critical, serious, moderate, minor")
                        .default_value("critical,serious"),
                )
                .arg(
                    arg!(-x --"exclude" <PATTERN>)
                        .required(false)
                        .help("Never follow links containing this text (repeatable; /logout is always excluded)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"exclude-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of exclusion patterns")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory to write per-page reports to")
                        .default_value(DEFAULT_REPORT_DIR),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Number of pages loaded and audited concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Page request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"audit-timeout" <SECONDS>)
                        .required(false)
                        .help("Per-page audit timeout in seconds; slower audits are recorded as failures")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"repo" <OWNER_NAME>)
                        .required(false)
                        .help("GitHub repository to file issues in (default: $GITHUB_REPOSITORY)"),
                )
                .arg(
                    arg!(-l --"label" <LABEL>)
                        .required(false)
                        .help("Label for filed issues (repeatable; default: accessibility, automated)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"dry-run")
                        .required(false)
                        .help("Do not write reports to disk or open real issues")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Summary format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Log every link decision")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("audit")
                .about("Audit a single page and print its report without crawling or filing issues")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to audit")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"impact" <LEVELS>)
                        .required(false)
                        .help("Comma separated impact levels to report")
                        .default_value("critical,serious"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Page request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"audit-timeout" <SECONDS>)
                        .required(false)
                        .help("Audit timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_audit_timeout() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "wayfinder",
                "crawl",
                "-u",
                "https://example.com",
                "--audit-timeout",
                "90",
            ])
            .unwrap();
        let (_, crawl) = matches.subcommand().unwrap();
        assert_eq!(crawl.get_one::<u64>("audit-timeout"), Some(&90));
    }

    #[test]
    fn test_crawl_audit_timeout_default() {
        let matches = command_argument_builder()
            .try_get_matches_from(["wayfinder", "crawl", "-u", "https://example.com"])
            .unwrap();
        let (_, crawl) = matches.subcommand().unwrap();
        assert_eq!(crawl.get_one::<u64>("audit-timeout"), Some(&30));
        assert_eq!(crawl.get_one::<u64>("timeout"), Some(&10));
    }

    #[test]
    fn test_crawl_audit_timeout_rejects_text() {
        let result = command_argument_builder().try_get_matches_from([
            "wayfinder",
            "crawl",
            "-u",
            "https://example.com",
            "--audit-timeout",
            "soon",
        ]);
        assert!(result.is_err());
    }
}
