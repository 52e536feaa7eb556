//! Link normalization: turns raw anchor hrefs into crawlable absolute URLs.

use crate::frontier::{Frontier, url_target};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Substring patterns for links that must never be followed, e.g. `/logout`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    patterns: Vec<String>,
}

impl ExclusionRules {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// The first pattern contained in `candidate`, if any.
    pub fn matched_by(&self, candidate: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| candidate.contains(p.as_str()))
            .map(String::as_str)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    Crawlable(Url),
    /// `#section` style in-page anchors.
    Fragment,
    Mailto,
    /// Another origin, a non-http scheme or a document-relative path.
    OutOfScope,
    Excluded(String),
    AlreadyVisited(Url),
    Malformed(String),
}

pub struct LinkNormalizer {
    base: Url,
    exclusions: ExclusionRules,
}

impl LinkNormalizer {
    pub fn new(base: Url, exclusions: ExclusionRules) -> Self {
        Self { base, exclusions }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Classify one href. `is_visited` is consulted with the resolved URL.
    pub fn classify(&self, href: &str, is_visited: impl Fn(&Url) -> bool) -> LinkClass {
        let href = href.trim();

        if href.is_empty() || href.starts_with('#') {
            return LinkClass::Fragment;
        }
        if href
            .get(..7)
            .map(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
            .unwrap_or(false)
        {
            return LinkClass::Mailto;
        }

        let mut resolved = match self.base.join(href) {
            Ok(url) => url,
            Err(e) => return LinkClass::Malformed(e.to_string()),
        };
        resolved.set_fragment(None);

        let root_relative = href.starts_with('/') && !href.starts_with("//");
        let absolute = Url::parse(href).is_ok();
        if !(root_relative || absolute) || resolved.origin() != self.base.origin() {
            return LinkClass::OutOfScope;
        }

        let target = url_target(&resolved);
        if let Some(pattern) = self
            .exclusions
            .matched_by(href)
            .or_else(|| self.exclusions.matched_by(&target))
        {
            return LinkClass::Excluded(pattern.to_string());
        }

        // Pages are identified by path; query variants collapse onto one page.
        resolved.set_query(None);

        if is_visited(&resolved) {
            return LinkClass::AlreadyVisited(resolved);
        }

        LinkClass::Crawlable(resolved)
    }

    /// Crawlable links of one page, de-duplicated, in extraction order.
    pub fn crawlable_links(&self, hrefs: &[String], frontier: &Frontier) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for href in hrefs {
            match self.classify(href, |url| frontier.is_visited(url)) {
                LinkClass::Crawlable(url) => {
                    if seen.insert(url.clone()) {
                        links.push(url);
                    }
                }
                LinkClass::Malformed(reason) => {
                    warn!("Dropping malformed link '{}': {}", href, reason);
                }
                other => {
                    debug!("Skipping link '{}': {:?}", href, other);
                }
            }
        }

        links
    }
}
