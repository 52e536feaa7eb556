//! Crawl frontier: pending work, in-flight pages and the per-run visited set.

use crate::links::ExclusionRules;
use std::collections::{HashMap, VecDeque};
use tracing::debug;
use url::Url;

/// A page waiting to be audited. `depth` is the remaining hop budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Pending,
    InFlight,
    Visited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// The URL is already pending, in flight or visited in this run.
    AlreadyKnown(PageState),
    DepthExhausted,
    /// Matched the contained exclusion pattern.
    Excluded(String),
}

/// FIFO frontier. A URL moves `Pending -> InFlight -> Visited` and never re-enters the queue.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    states: HashMap<Url, PageState>,
    exclusions: ExclusionRules,
}

impl Frontier {
    pub fn new(exclusions: ExclusionRules) -> Self {
        Self {
            queue: VecDeque::new(),
            states: HashMap::new(),
            exclusions,
        }
    }

    pub fn enqueue(&mut self, url: Url, depth: i32) -> EnqueueOutcome {
        if let Some(state) = self.states.get(&url) {
            return EnqueueOutcome::AlreadyKnown(*state);
        }
        if depth < 0 {
            return EnqueueOutcome::DepthExhausted;
        }
        if let Some(pattern) = self.exclusions.matched_by(url_target(&url).as_str()) {
            return EnqueueOutcome::Excluded(pattern.to_string());
        }

        debug!("Queued {} (remaining depth {})", url, depth);
        self.states.insert(url.clone(), PageState::Pending);
        self.queue.push_back(CrawlTask { url, depth });
        EnqueueOutcome::Queued
    }

    /// Next pending task in discovery order, now marked in flight.
    pub fn dequeue(&mut self) -> Option<CrawlTask> {
        let task = self.queue.pop_front()?;
        self.states.insert(task.url.clone(), PageState::InFlight);
        Some(task)
    }

    /// Dequeue up to `limit` tasks, preserving discovery order.
    pub fn dequeue_batch(&mut self, limit: usize) -> Vec<CrawlTask> {
        let mut batch = Vec::with_capacity(limit.min(self.queue.len()));
        while batch.len() < limit {
            match self.dequeue() {
                Some(task) => batch.push(task),
                None => break,
            }
        }
        batch
    }

    pub fn mark_visited(&mut self, url: &Url) {
        self.states.insert(url.clone(), PageState::Visited);
    }

    pub fn state_of(&self, url: &Url) -> Option<PageState> {
        self.states.get(url).copied()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.state_of(url) == Some(PageState::Visited)
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == PageState::Visited)
            .count()
    }

    /// True once nothing is left to dequeue.
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Path plus query, the part of a URL exclusion patterns are matched against.
pub(crate) fn url_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
