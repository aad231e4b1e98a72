//! Fluent builder for [`TrawlConfig`].

use anyhow::{Result, anyhow};
use std::path::PathBuf;

use super::{
    DEFAULT_CONCURRENCY, DEFAULT_KEYWORDS, DEFAULT_MAX_DEPTH, DEFAULT_RENDER_TIMEOUT_SECS,
    DEFAULT_TABLE_SELECTOR, DEFAULT_TOR_PROXY, TrawlConfig,
};

pub struct TrawlConfigBuilder {
    seed_url: Option<String>,
    data_dir: PathBuf,
    max_depth: u32,
    max_concurrent_pages: usize,
    keywords: Vec<String>,
    table_selector: String,
    proxy: Option<String>,
    render_timeout_secs: u64,
    headless: bool,
}

impl Default for TrawlConfigBuilder {
    fn default() -> Self {
        Self {
            seed_url: None,
            data_dir: PathBuf::from("./trawl-data"),
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent_pages: DEFAULT_CONCURRENCY,
            keywords: DEFAULT_KEYWORDS.iter().map(|s| (*s).to_string()).collect(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_string(),
            proxy: Some(DEFAULT_TOR_PROXY.to_string()),
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            headless: true,
        }
    }
}

impl TrawlConfigBuilder {
    #[must_use]
    pub fn seed_url(mut self, url: impl Into<String>) -> Self {
        self.seed_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn max_concurrent_pages(mut self, limit: usize) -> Self {
        self.max_concurrent_pages = limit;
        self
    }

    #[must_use]
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    #[must_use]
    pub fn table_selector(mut self, selector: impl Into<String>) -> Self {
        self.table_selector = selector.into();
        self
    }

    /// SOCKS proxy for the browser; pass `None` to connect directly.
    #[must_use]
    pub fn proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.render_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Validate and produce the config.
    ///
    /// The seed URL is normalized (scheme defaulted to `http://`, which is
    /// what onion services speak) and must parse. A zero concurrency limit
    /// or zero timeout is rejected rather than silently clamped.
    pub fn build(self) -> Result<TrawlConfig> {
        let raw = self.seed_url.ok_or_else(|| anyhow!("seed_url is required"))?;

        let seed_url = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw
        } else {
            format!("http://{raw}")
        };
        url::Url::parse(&seed_url).map_err(|e| anyhow!("invalid seed URL '{seed_url}': {e}"))?;

        if self.max_concurrent_pages == 0 {
            return Err(anyhow!("max_concurrent_pages must be at least 1"));
        }
        if self.render_timeout_secs == 0 {
            return Err(anyhow!("render_timeout_secs must be at least 1"));
        }

        Ok(TrawlConfig {
            seed_url,
            data_dir: self.data_dir,
            max_depth: self.max_depth,
            max_concurrent_pages: self.max_concurrent_pages,
            keywords: self.keywords,
            table_selector: self.table_selector,
            proxy: self.proxy,
            render_timeout_secs: self.render_timeout_secs,
            headless: self.headless,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_url_scheme_defaulted() {
        let config = TrawlConfig::builder()
            .seed_url("exampleonionmarket.onion/listings")
            .build()
            .expect("config should build");
        assert_eq!(config.seed_url(), "http://exampleonionmarket.onion/listings");
    }

    #[test]
    fn missing_seed_url_rejected() {
        assert!(TrawlConfig::builder().build().is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let result = TrawlConfig::builder()
            .seed_url("http://example.com")
            .max_concurrent_pages(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn defaults_applied() {
        let config = TrawlConfig::builder()
            .seed_url("http://example.com")
            .build()
            .expect("config should build");
        assert_eq!(config.max_concurrent_pages(), DEFAULT_CONCURRENCY);
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(config.table_selector(), "table.vtable");
        assert_eq!(config.proxy(), Some(DEFAULT_TOR_PROXY));
        assert!(config.keywords().iter().any(|k| k == "fentanyl"));
    }
}
