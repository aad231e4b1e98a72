//! Renderer adapter: loads a URL in the browser and returns the final HTML
//! plus outbound links.
//!
//! The [`Renderer`] trait is the seam between the crawl engine and the
//! browser. Production uses [`ChromiumRenderer`]; tests script the trait
//! directly. Every acquired page handle is released on every exit path,
//! including task cancellation, via [`PageGuard`].

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Outcome of rendering one page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final DOM serialized to HTML, after scripts have run.
    pub html: String,
    /// Absolute outbound link URLs discovered in the document.
    pub links: Vec<String>,
}

/// Per-page render failures.
///
/// These are the only failures a visit pipeline can observe from the render
/// step; both degrade the page to a `failed` log entry and never abort the
/// crawl.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// Loads a URL through a browser-like surface.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError>;
}

/// Script evaluated in the page to collect outbound links.
const LINKS_JS: &str = r"
    Array.from(document.querySelectorAll('a[href]'))
        .map(a => a.href)
        .filter(href => href.startsWith('http'))
";

/// Closes the wrapped page when dropped, whatever path got us there.
///
/// `Page::close` is async, so the close is handed to the runtime; the guard
/// itself never blocks.
struct PageGuard {
    page: Option<Page>,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self { page: Some(page) }
    }

    fn page(&self) -> &Page {
        // Only None after drop.
        self.page.as_ref().expect("page taken before drop")
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            tokio::spawn(async move {
                if let Err(e) = page.close().await {
                    debug!("Failed to close page: {e}");
                }
            });
        }
    }
}

/// [`Renderer`] backed by a shared chromiumoxide [`Browser`].
///
/// One fresh page per `render` call; the scheduler's semaphore is what keeps
/// the number of live pages bounded.
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
}

impl ChromiumRenderer {
    #[must_use]
    pub fn new(browser: Arc<Browser>) -> Self {
        Self { browser }
    }
}

async fn with_timeout<F, T, E>(
    operation: F,
    timeout: Duration,
) -> Result<Result<T, E>, RenderError>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| RenderError::Timeout(timeout))
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Navigation(format!("failed to open page: {e}")))?;
        let guard = PageGuard::new(page);

        with_timeout(guard.page().goto(url), timeout)
            .await?
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        with_timeout(guard.page().wait_for_navigation(), timeout)
            .await?
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let html = with_timeout(guard.page().content(), timeout)
            .await?
            .map_err(|e| RenderError::Navigation(format!("failed to read content: {e}")))?;

        // Link discovery is best-effort; a page that renders but defeats the
        // link script still yields its content.
        let links = match guard.page().evaluate(LINKS_JS).await {
            Ok(result) => match result.into_value::<Vec<String>>() {
                Ok(links) => links,
                Err(e) => {
                    warn!("Failed to parse links from {url}: {e}");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Link extraction script failed on {url}: {e}");
                Vec::new()
            }
        };

        debug!("Rendered {url}: {} bytes, {} links", html.len(), links.len());
        Ok(RenderedPage { html, links })
    }
}
