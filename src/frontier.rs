//! Frontier queue and visited-set bookkeeping.
//!
//! The frontier holds `(url, remaining-depth)` pairs awaiting dispatch and
//! guarantees each URL is dispatched at most once per run, no matter how
//! many concurrent workers discover it. `DashSet::insert` is the single
//! linearization point: exactly one caller of [`Frontier::mark_visited`]
//! observes `true` for any URL.

use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One unit of crawl work: a URL and its remaining link-hop budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    /// Remaining hops. Strictly decreases along any discovery chain; an
    /// entry with `depth == 0` is never enqueued, so never dispatched.
    pub depth: u32,
}

/// Normalize a URL for dedup: strip the fragment, require http(s).
///
/// Fragments are client-side markers, not distinct resources; following the
/// same page twice under different anchors would defeat dedup.
#[must_use]
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = url::Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Work queue plus dedup sets, shared across all visit tasks.
pub struct Frontier {
    queue: Mutex<VecDeque<FrontierEntry>>,
    /// URLs ever enqueued; suppresses duplicate queue entries.
    queued: DashSet<String>,
    /// URLs ever dispatched; append-only for the run's lifetime.
    visited: DashSet<String>,
}

impl Frontier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            queued: DashSet::new(),
            visited: DashSet::new(),
        }
    }

    /// Add an entry unless it is exhausted (`depth == 0`), malformed,
    /// already visited, or already queued. Returns whether it was added.
    pub fn enqueue(&self, url: &str, depth: u32) -> bool {
        if depth == 0 {
            return false;
        }
        let Some(normalized) = normalize_url(url) else {
            return false;
        };
        if self.visited.contains(&normalized) {
            return false;
        }
        // First inserter wins; losers see an existing entry and back off.
        if !self.queued.insert(normalized.clone()) {
            return false;
        }
        self.queue
            .lock()
            .expect("frontier queue lock poisoned")
            .push_back(FrontierEntry {
                url: normalized,
                depth,
            });
        true
    }

    /// Remove and return the next entry, FIFO.
    pub fn dequeue(&self) -> Option<FrontierEntry> {
        self.queue
            .lock()
            .expect("frontier queue lock poisoned")
            .pop_front()
    }

    /// Atomically mark a URL visited; `true` means this caller was first.
    /// Callers must skip processing on `false`.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue
            .lock()
            .expect("frontier queue lock poisoned")
            .is_empty()
    }

    /// Number of URLs dispatched so far.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_never_enqueued() {
        let frontier = Frontier::new();
        assert!(!frontier.enqueue("http://example.com/", 0));
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn duplicate_enqueue_suppressed() {
        let frontier = Frontier::new();
        assert!(frontier.enqueue("http://example.com/page", 2));
        assert!(!frontier.enqueue("http://example.com/page", 2));
        assert!(frontier.dequeue().is_some());
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn fragment_variants_collapse() {
        let frontier = Frontier::new();
        assert!(frontier.enqueue("http://example.com/page#a", 1));
        assert!(!frontier.enqueue("http://example.com/page#b", 1));
        let entry = frontier.dequeue().expect("entry present");
        assert_eq!(entry.url, "http://example.com/page");
    }

    #[test]
    fn non_http_schemes_rejected() {
        let frontier = Frontier::new();
        assert!(!frontier.enqueue("mailto:vendor@example.com", 3));
        assert!(!frontier.enqueue("javascript:void(0)", 3));
    }

    #[test]
    fn mark_visited_first_wins() {
        let frontier = Frontier::new();
        assert!(frontier.mark_visited("http://example.com/"));
        assert!(!frontier.mark_visited("http://example.com/"));
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn visited_url_not_requeued() {
        let frontier = Frontier::new();
        frontier.mark_visited("http://example.com/done");
        assert!(!frontier.enqueue("http://example.com/done", 2));
    }
}
