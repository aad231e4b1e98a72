//! The per-URL visit pipeline.
//!
//! Each visit walks the state machine
//! `RENDERING → EXTRACTING → PERSISTING → DONE`, with `FAILED` absorbing
//! from `RENDERING`. Whatever the terminal state, exactly one page-log
//! entry is written before the pipeline completes — the unconditional
//! finalization the persistence contract requires.

use log::{debug, error, info};
use scraper::Selector;
use std::time::Duration;

use super::types::{ExtractionResult, PageLogEntry, PageStatus, VisitOutcome};
use crate::extract::{match_keywords, parse_tables};
use crate::frontier::{Frontier, FrontierEntry};
use crate::render::{RenderError, RenderedPage, Renderer};
use crate::store::Sink;

/// Shared collaborators handed to every visit task.
pub(crate) struct VisitContext<'a> {
    pub renderer: &'a dyn Renderer,
    pub sink: &'a dyn Sink,
    pub frontier: &'a Frontier,
    pub keywords: &'a [String],
    pub table_selector: &'a Selector,
    pub render_timeout: Duration,
}

enum VisitState {
    Rendering,
    Extracting(RenderedPage),
    Persisting(ExtractionResult, Vec<String>),
    Done(PageStatus, usize),
    Failed(RenderError),
}

/// Drive one URL through the pipeline. Never returns an error: every
/// failure mode degrades to a `failed` log entry so the crawl continues.
pub(crate) async fn visit_page(ctx: &VisitContext<'_>, entry: &FrontierEntry) -> VisitOutcome {
    debug_assert!(entry.depth > 0, "depth-0 entries must never be dispatched");
    info!("Visiting [{} hops left]: {}", entry.depth, entry.url);

    let mut state = VisitState::Rendering;

    let (status, error, links_enqueued) = loop {
        state = match state {
            VisitState::Rendering => {
                match ctx.renderer.render(&entry.url, ctx.render_timeout).await {
                    Ok(page) => VisitState::Extracting(page),
                    Err(err) => VisitState::Failed(err),
                }
            }

            VisitState::Extracting(page) => {
                let matched = match_keywords(&page.html, ctx.keywords);
                let rows = parse_tables(&page.html, ctx.table_selector);
                let result = ExtractionResult::new(entry.url.clone(), matched, rows);
                VisitState::Persisting(result, page.links)
            }

            VisitState::Persisting(result, links) => {
                let status = if result.matched_keywords.is_empty() {
                    PageStatus::NoMatch
                } else {
                    info!(
                        "Keywords {:?} found on {}",
                        result.matched_keywords, result.url
                    );
                    PageStatus::Success
                };

                // Reported, not swallowed: a sink write failure is an error
                // in the log and the crawl moves on.
                if let Err(e) = ctx.sink.record(&result).await {
                    error!("Failed to record extraction result for {}: {e:#}", result.url);
                }

                let mut enqueued = 0;
                for link in &links {
                    if ctx.frontier.enqueue(link, entry.depth - 1) {
                        enqueued += 1;
                    }
                }
                debug!(
                    "{}: {} links discovered, {} enqueued",
                    entry.url,
                    links.len(),
                    enqueued
                );

                VisitState::Done(status, enqueued)
            }

            VisitState::Done(status, enqueued) => break (status, None, enqueued),

            VisitState::Failed(err) => {
                info!("Render failed for {}: {err}", entry.url);
                break (PageStatus::Failed, Some(err.to_string()), 0);
            }
        };
    };

    // Finalization: one log entry per attempt, whatever happened above.
    let log_entry = match error {
        Some(cause) => PageLogEntry::failed(entry.url.clone(), cause),
        None => PageLogEntry::completed(entry.url.clone(), status),
    };
    if let Err(e) = ctx.sink.log_page(&log_entry).await {
        error!("Failed to write page log for {}: {e:#}", entry.url);
    }

    VisitOutcome {
        url: entry.url.clone(),
        status,
        links_enqueued,
    }
}
