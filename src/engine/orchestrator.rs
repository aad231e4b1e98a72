//! Crawl scheduling: bounded-concurrency frontier draining.
//!
//! The scheduler pulls entries from the frontier, marks them visited, and
//! runs each through the visit pipeline under a counting semaphore of
//! capacity `N`. It blocks until the frontier is empty and every in-flight
//! visit has completed. A single page failure never aborts the run; the
//! only fatal conditions are frontier corruption (a depth-0 entry escaping
//! into dispatch) and a semaphore that has been closed under us.

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

use super::types::{CrawlSummary, PageStatus};
use super::visit::{VisitContext, visit_page};
use crate::config::TrawlConfig;
use crate::extract::compile_table_selector;
use crate::frontier::Frontier;
use crate::render::Renderer;
use crate::store::Sink;

/// Drive a full crawl from the configured seed to frontier exhaustion.
///
/// When `shutdown` becomes true, dispatching stops and outstanding frontier
/// entries are dropped; visits already in flight run to completion (and
/// through their log-entry finalization) before this returns.
pub async fn crawl_pages(
    config: &TrawlConfig,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn Sink>,
    shutdown: Arc<AtomicBool>,
) -> Result<CrawlSummary> {
    let keywords: Arc<Vec<String>> = Arc::new(config.keywords().to_vec());
    let table_selector = Arc::new(compile_table_selector(config.table_selector())?);
    let render_timeout = config.render_timeout();

    let frontier = Arc::new(Frontier::new());
    if !frontier.enqueue(config.seed_url(), config.max_depth()) {
        warn!(
            "Seed {} not enqueued (max_depth {}); nothing to crawl",
            config.seed_url(),
            config.max_depth()
        );
        return Ok(CrawlSummary::default());
    }

    let concurrency = config.max_concurrent_pages();
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut active = FuturesUnordered::new();
    let mut summary = CrawlSummary::default();
    let mut shutdown_logged = false;

    loop {
        // Fill up to the concurrency limit.
        while active.len() < concurrency {
            if shutdown.load(Ordering::Relaxed) {
                if !shutdown_logged {
                    info!("Shutdown requested; draining in-flight visits");
                    shutdown_logged = true;
                }
                break;
            }

            let Some(entry) = frontier.dequeue() else {
                break;
            };

            if entry.depth == 0 {
                return Err(anyhow!(
                    "frontier invariant violated: depth-0 entry dispatched for {}",
                    entry.url
                ));
            }

            // Atomic check-and-set; losers discard the entry.
            if !frontier.mark_visited(&entry.url) {
                continue;
            }

            // One permit per active task, so this never blocks here.
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("concurrency semaphore closed unexpectedly")?;

            let renderer = Arc::clone(&renderer);
            let sink = Arc::clone(&sink);
            let frontier = Arc::clone(&frontier);
            let keywords = Arc::clone(&keywords);
            let table_selector = Arc::clone(&table_selector);

            let task = tokio::spawn(async move {
                // Held until the visit (and its finalization) completes.
                let _permit = permit;
                let ctx = VisitContext {
                    renderer: renderer.as_ref(),
                    sink: sink.as_ref(),
                    frontier: frontier.as_ref(),
                    keywords: &keywords,
                    table_selector: &table_selector,
                    render_timeout,
                };
                visit_page(&ctx, &entry).await
            });
            active.push(task);
        }

        // Wait for at least one visit to finish.
        match active.next().await {
            Some(Ok(outcome)) => {
                summary.visited += 1;
                match outcome.status {
                    PageStatus::Success => summary.matched += 1,
                    PageStatus::NoMatch => summary.no_match += 1,
                    PageStatus::Failed => summary.failed += 1,
                }
            }
            Some(Err(e)) => {
                error!("Visit task panicked: {e}");
            }
            None => {
                if frontier.is_empty() || shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }
        }

        if active.is_empty() && (frontier.is_empty() || shutdown.load(Ordering::Relaxed)) {
            break;
        }
    }

    info!("Crawl finished: {summary}");
    Ok(summary)
}
