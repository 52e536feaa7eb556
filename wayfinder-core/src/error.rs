use std::path::PathBuf;
use thiserror::Error;

/// Problems with the crawl configuration. These are the only fatal errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Max depth must not be negative (got {0})")]
    NegativeDepth(i32),

    #[error("At least one worker is required")]
    NoWorkers,

    #[error("Impact filter must name at least one impact level")]
    EmptyImpactFilter,

    #[error("{0}")]
    InvalidImpact(String),

    #[error("Invalid repository '{0}' (expected OWNER/NAME)")]
    InvalidRepository(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid report key '{0}'")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Issue tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Issue tracker returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Issue tracker unavailable: {0}")]
    Unavailable(String),
}

/// Fatal crawl errors. Everything page-scoped is recorded on the page outcome instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
