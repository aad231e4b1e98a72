//! Configuration for a trawl run.
//!
//! All knobs are supplied at startup; there is no runtime reconfiguration.
//! The builder in [`builder`] validates the seed URL and clamps the
//! concurrency limit before a [`TrawlConfig`] can exist.

mod builder;

pub use builder::TrawlConfigBuilder;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of concurrently in-flight page visits.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default remaining-hop budget for the seed URL (1 = seed page only).
pub const DEFAULT_MAX_DEPTH: u32 = 1;

/// Default per-page render timeout in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;

/// Default Tor SOCKS proxy endpoint (Tor Browser's bundled port).
pub const DEFAULT_TOR_PROXY: &str = "socks5://127.0.0.1:9150";

/// CSS selector for vendor/shipping tables on marketplace listings.
pub const DEFAULT_TABLE_SELECTOR: &str = "table.vtable";

/// Keywords scanned for on every rendered page.
pub const DEFAULT_KEYWORDS: &[&str] = &["precursors", "safrole", "fentanyl", "cocaine"];

/// Configuration for a single crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrawlConfig {
    /// Normalized seed URL; always parses as http(s).
    pub(crate) seed_url: String,
    /// Directory holding the SQLite result database.
    pub(crate) data_dir: PathBuf,
    /// Remaining link-hops granted to the seed. Entries reaching 0 are
    /// never dispatched, so 1 means the seed page only.
    pub(crate) max_depth: u32,
    /// Upper bound on concurrently active visit pipelines.
    pub(crate) max_concurrent_pages: usize,
    /// Keyword list matched case-insensitively against rendered HTML.
    pub(crate) keywords: Vec<String>,
    /// CSS selector locating vendor tables.
    pub(crate) table_selector: String,
    /// SOCKS proxy URL passed to the browser, or `None` for a direct
    /// (clearnet) connection.
    pub(crate) proxy: Option<String>,
    /// Per-page navigation/render timeout.
    pub(crate) render_timeout_secs: u64,
    pub(crate) headless: bool,
}

impl TrawlConfig {
    /// Start building a config; `seed_url` is the only required field.
    #[must_use]
    pub fn builder() -> TrawlConfigBuilder {
        TrawlConfigBuilder::default()
    }

    #[must_use]
    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub fn max_concurrent_pages(&self) -> usize {
        self.max_concurrent_pages
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn table_selector(&self) -> &str {
        &self.table_selector
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }
}
