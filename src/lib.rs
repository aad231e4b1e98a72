//! tortrawl — a keyword crawler for Tor-routed marketplaces.
//!
//! Renders pages in headless Chromium behind a SOCKS proxy, scans the
//! rendered HTML for configured keywords, extracts vendor/shipping tables,
//! persists everything to SQLite, and follows links breadth-first under a
//! bounded hop budget.
//!
//! # Example
//!
//! ```no_run
//! use tortrawl::TrawlConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = TrawlConfig::builder()
//!     .seed_url("http://example.onion/market")
//!     .max_depth(2)
//!     .build()?;
//! let summary = tortrawl::crawl(&config).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod engine;
pub mod extract;
pub mod frontier;
pub mod render;
pub mod store;

pub use config::{TrawlConfig, TrawlConfigBuilder};
pub use engine::{CrawlSummary, ExtractionResult, PageLogEntry, PageStatus};
pub use extract::TableRow;
pub use render::{RenderError, RenderedPage, Renderer};
pub use store::{Sink, SqliteStore};

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Run a full crawl from the configured seed until the frontier is drained.
pub async fn crawl(config: &TrawlConfig) -> Result<CrawlSummary> {
    crawl_with_shutdown(config, Arc::new(AtomicBool::new(false))).await
}

/// [`crawl`], but dispatch stops once `shutdown` becomes true; visits
/// already in flight complete and log before this returns.
pub async fn crawl_with_shutdown(
    config: &TrawlConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<CrawlSummary> {
    // The store must be reachable before a browser is worth launching.
    let store = SqliteStore::open(config.data_dir())
        .await
        .context("Failed to open result store")?;

    let (browser, handler_task, user_data_dir) = browser::launch_browser(config).await?;
    let browser = Arc::new(browser);

    let renderer: Arc<dyn Renderer> = Arc::new(render::ChromiumRenderer::new(Arc::clone(&browser)));
    let sink: Arc<dyn Sink> = Arc::new(store.clone());

    let result = engine::crawl_pages(config, renderer, sink, shutdown).await;

    // Teardown happens even when the crawl errored.
    match Arc::try_unwrap(browser) {
        Ok(mut browser) => {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser cleanly: {e}");
            }
            let _ = browser.wait().await;
        }
        Err(_) => warn!("Browser still referenced at shutdown; skipping close"),
    }
    handler_task.abort();
    let _ = handler_task.await;

    if let Err(e) = std::fs::remove_dir_all(&user_data_dir) {
        warn!(
            "Failed to remove browser profile {}: {e}",
            user_data_dir.display()
        );
    }

    store.close().await;
    info!("Shutdown complete");

    result
}
