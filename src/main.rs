use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tortrawl::TrawlConfig;
use tortrawl::config::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH, DEFAULT_RENDER_TIMEOUT_SECS, DEFAULT_TOR_PROXY,
};

/// Crawl a site through Tor, scanning rendered pages for keywords and
/// vendor/shipping tables.
#[derive(Parser, Debug)]
#[command(name = "tortrawl", version, about)]
struct Cli {
    /// Seed URL to start crawling from (scheme defaults to http://)
    seed_url: String,

    /// Link-hop budget for the seed (1 = seed page only)
    #[arg(default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Maximum concurrently rendered pages
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Keyword to scan for; repeatable, replaces the built-in list
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,

    /// SOCKS proxy the browser connects through
    #[arg(long, default_value = DEFAULT_TOR_PROXY)]
    proxy: String,

    /// Connect directly instead of through a proxy
    #[arg(long, conflicts_with = "proxy")]
    no_proxy: bool,

    /// Directory for the SQLite result database
    #[arg(long, default_value = "./trawl-data")]
    data_dir: PathBuf,

    /// CSS selector for vendor tables
    #[arg(long)]
    selector: Option<String>,

    /// Per-page render timeout in seconds
    #[arg(long, default_value_t = DEFAULT_RENDER_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        // The CDP connection is far too chatty for a crawl log.
        .filter_module("chromiumoxide::handler", LevelFilter::Off)
        .filter_module("chromiumoxide::conn", LevelFilter::Off)
        .filter_module("chromiumoxide_cdp", LevelFilter::Off)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut builder = TrawlConfig::builder()
        .seed_url(&cli.seed_url)
        .max_depth(cli.max_depth)
        .max_concurrent_pages(cli.concurrency)
        .data_dir(cli.data_dir)
        .render_timeout_secs(cli.timeout_secs)
        .headless(!cli.headed);

    builder = if cli.no_proxy {
        builder.proxy(None)
    } else {
        builder.proxy(Some(cli.proxy))
    };
    if !cli.keywords.is_empty() {
        builder = builder.keywords(cli.keywords);
    }
    if let Some(selector) = cli.selector {
        builder = builder.table_selector(selector);
    }
    let config = builder.build()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; finishing in-flight pages");
            shutdown_flag.store(true, Ordering::Relaxed);
        }
    });

    match tortrawl::crawl_with_shutdown(&config, shutdown).await {
        Ok(summary) => {
            println!("{summary}");
            Ok(())
        }
        Err(e) => {
            error!("Crawl failed: {e:#}");
            Err(e)
        }
    }
}
