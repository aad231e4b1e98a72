//! Crawl engine: scheduling, the per-URL visit pipeline, and the result
//! model shared between them.

pub mod orchestrator;
pub mod types;
mod visit;

pub use orchestrator::crawl_pages;
pub use types::{CrawlSummary, ExtractionResult, PageLogEntry, PageStatus, VisitOutcome};
