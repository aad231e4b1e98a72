//! Result and outcome types for the crawl engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::extract::TableRow;

/// Outcome class of one crawl attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Rendered cleanly and at least one keyword matched.
    Success,
    /// Rendered cleanly, zero keyword matches. A valid outcome, not an error.
    NoMatch,
    /// Render failed (navigation error or timeout).
    Failed,
}

impl PageStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoMatch => "no_match",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything extracted from one successfully rendered page.
///
/// Immutable once produced; keyed by `(url, retrieved_at)` in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub retrieved_at: DateTime<Utc>,
    pub matched_keywords: BTreeSet<String>,
    pub table_rows: Vec<TableRow>,
}

impl ExtractionResult {
    #[must_use]
    pub fn new(url: String, matched_keywords: BTreeSet<String>, table_rows: Vec<TableRow>) -> Self {
        Self {
            url,
            retrieved_at: Utc::now(),
            matched_keywords,
            table_rows,
        }
    }
}

/// One log record per crawl attempt, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLogEntry {
    pub url: String,
    pub status: PageStatus,
    pub error: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl PageLogEntry {
    #[must_use]
    pub fn completed(url: String, status: PageStatus) -> Self {
        Self {
            url,
            status,
            error: None,
            logged_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn failed(url: String, error: String) -> Self {
        Self {
            url,
            status: PageStatus::Failed,
            error: Some(error),
            logged_at: Utc::now(),
        }
    }
}

/// What a visit task reports back to the scheduler.
#[derive(Debug, Clone)]
pub struct VisitOutcome {
    pub url: String,
    pub status: PageStatus,
    pub links_enqueued: usize,
}

/// End-of-run totals, tallied by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub visited: usize,
    pub matched: usize,
    pub no_match: usize,
    pub failed: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages visited: {} matched, {} without matches, {} failed",
            self.visited, self.matched, self.no_match, self.failed
        )
    }
}
