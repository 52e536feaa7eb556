use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Rule id carried by the placeholder violation recorded when a page could not be audited.
pub const AUDIT_FAILED_RULE: &str = "audit-failed";

/// Severity of a violation, using the axe-core impact vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl Impact {
    pub const ALL: [Impact; 4] = [
        Impact::Critical,
        Impact::Serious,
        Impact::Moderate,
        Impact::Minor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Critical => "critical",
            Impact::Serious => "serious",
            Impact::Moderate => "moderate",
            Impact::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Impact::Critical),
            "serious" => Ok(Impact::Serious),
            "moderate" => Ok(Impact::Moderate),
            "minor" => Ok(Impact::Minor),
            other => Err(format!("Unknown impact level: {}", other)),
        }
    }
}

/// A single accessibility rule failure reported for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub impact: Impact,
    pub description: String,
    pub help_url: String,
    /// Offending DOM snippets, in document order.
    pub nodes: Vec<String>,
}

impl Violation {
    pub fn new(rule_id: &str, impact: Impact, description: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            impact,
            description: description.to_string(),
            help_url: String::new(),
            nodes: Vec::new(),
        }
    }

    pub fn with_help_url(mut self, help_url: &str) -> Self {
        self.help_url = help_url.to_string();
        self
    }

    pub fn with_node(mut self, snippet: impl Into<String>) -> Self {
        self.nodes.push(snippet.into());
        self
    }

    pub fn with_nodes<I, S>(mut self, snippets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.extend(snippets.into_iter().map(Into::into));
        self
    }

    /// Placeholder recorded when navigation or the audit itself failed.
    pub fn audit_failed(reason: &str) -> Self {
        Self::new(
            AUDIT_FAILED_RULE,
            Impact::Critical,
            &format!("The page could not be audited: {}", reason),
        )
    }

    pub fn is_audit_failure(&self) -> bool {
        self.rule_id == AUDIT_FAILED_RULE
    }
}

/// A page fetched over HTTP, used as the page handle by [`crate::HttpPageLoader`].
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// Final URL after redirects.
    pub url: Url,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub response_time: Duration,
}

impl LoadedPage {
    pub fn new(url: Url, body: String) -> Self {
        Self {
            url,
            status_code: 200,
            content_type: Some("text/html".to_string()),
            body,
            response_time: Duration::from_secs(0),
        }
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(false)
    }
}
