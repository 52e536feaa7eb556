//! GitHub issues backend for the deduplicator.
//!
//! The token is read from `GITHUB_TOKEN` and only ever handed to
//! `bearer_auth()`. It is not logged and never appears in error messages.

use crate::error::{ConfigError, TrackerError};
use crate::tracker::{CreatedIssue, Issue, IssueTracker};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "wayfinder";
const PER_PAGE: usize = 100;
/// Upper bound on listing pages fetched for one lookup.
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct ListedIssue {
    title: String,
    /// Present only when the "issue" is a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

pub struct GitHubTracker {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GitHubTracker {
    /// Tracker for `OWNER/NAME`, configured from `GITHUB_API_URL` and `GITHUB_TOKEN`.
    pub fn new(repository: &str) -> Result<Self, ConfigError> {
        let (owner, repo) = parse_repository(repository)?;
        let api_url = std::env::var("GITHUB_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        Ok(Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            owner,
            repo,
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, self.owner, self.repo)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Split `OWNER/NAME` into its two non-empty parts.
pub fn parse_repository(repository: &str) -> Result<(String, String), ConfigError> {
    let invalid = || ConfigError::InvalidRepository(repository.to_string());
    let (owner, repo) = repository.trim().split_once('/').ok_or_else(invalid)?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid());
    }
    Ok((owner.to_string(), repo.to_string()))
}

async fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

    Err(TrackerError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    async fn find_open_issue(&self, title: &str) -> Result<bool, TrackerError> {
        let url = self.issues_url();

        for page in 1..=MAX_PAGES {
            let request = self.client.get(&url).query(&[
                ("state", "open".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let response = check_status(self.authorize(request).send().await?).await?;
            let issues: Vec<ListedIssue> = response.json().await?;

            debug!("Fetched {} open issue(s) from page {}", issues.len(), page);

            if issues
                .iter()
                .any(|i| i.pull_request.is_none() && i.title == title)
            {
                return Ok(true);
            }
            if issues.len() < PER_PAGE {
                return Ok(false);
            }
        }

        Err(TrackerError::Unavailable(format!(
            "more than {} pages of open issues in {}",
            MAX_PAGES,
            self.repository()
        )))
    }

    async fn create_issue(&self, issue: &Issue) -> Result<CreatedIssue, TrackerError> {
        let payload = serde_json::json!({
            "title": issue.title,
            "body": issue.body,
            "labels": issue.labels,
        });

        let request = self.client.post(self.issues_url()).json(&payload);
        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        assert_eq!(
            parse_repository("acme/site").unwrap(),
            ("acme".to_string(), "site".to_string())
        );
        assert!(parse_repository("acme").is_err());
        assert!(parse_repository("/site").is_err());
        assert!(parse_repository("acme/").is_err());
        assert!(parse_repository("acme/site/extra").is_err());
    }
}
