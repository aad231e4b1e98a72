//! Crawl engine integration tests against scripted renderer/sink mocks.
//!
//! These exercise the scheduling contracts end to end: dedup across
//! discovery paths, the hop budget, bounded concurrency, and the one-log-
//! entry-per-attempt persistence guarantee.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tortrawl::engine::crawl_pages;
use tortrawl::{
    ExtractionResult, PageLogEntry, PageStatus, RenderError, RenderedPage, Renderer, Sink,
    TrawlConfig,
};

/// What the scripted renderer does when asked for a URL.
#[derive(Clone)]
enum Script {
    Page { html: String, links: Vec<String> },
    Fail(String),
    Timeout,
}

fn page(html: &str, links: &[&str]) -> Script {
    Script::Page {
        html: html.to_string(),
        links: links.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// Renderer that serves canned pages and tracks how it was driven.
struct ScriptedRenderer {
    scripts: HashMap<String, Script>,
    rendered: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedRenderer {
    fn new(scripts: Vec<(&str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(url, s)| (url.to_string(), s))
                .collect(),
            rendered: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    fn rendered_urls(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    fn peak_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        // Yield long enough for sibling visits to overlap.
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.rendered.lock().unwrap().push(url.to_string());
        match self.scripts.get(url) {
            Some(Script::Page { html, links }) => Ok(RenderedPage {
                html: html.clone(),
                links: links.clone(),
            }),
            Some(Script::Fail(msg)) => Err(RenderError::Navigation(msg.clone())),
            Some(Script::Timeout) => Err(RenderError::Timeout(timeout)),
            None => Err(RenderError::Navigation(format!("no script for {url}"))),
        }
    }
}

/// In-memory sink capturing every write.
#[derive(Default)]
struct MemorySink {
    results: Mutex<Vec<ExtractionResult>>,
    log: Mutex<Vec<PageLogEntry>>,
}

#[async_trait]
impl Sink for MemorySink {
    async fn record(&self, result: &ExtractionResult) -> anyhow::Result<()> {
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn log_page(&self, entry: &PageLogEntry) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

fn config(seed: &str, max_depth: u32, concurrency: usize) -> TrawlConfig {
    TrawlConfig::builder()
        .seed_url(seed)
        .max_depth(max_depth)
        .max_concurrent_pages(concurrency)
        .keywords(vec!["fentanyl".to_string()])
        .build()
        .expect("test config should build")
}

#[tokio::test]
async fn self_linking_seed_visited_exactly_once() {
    let seed = "http://market.test/";
    let renderer = Arc::new(ScriptedRenderer::new(vec![(
        seed,
        page("<p>nothing here</p>", &[seed]),
    )]));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config(seed, 2, 2),
        renderer.clone(),
        sink.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.visited, 1);
    assert_eq!(renderer.rendered_urls(), vec![seed.to_string()]);
    assert_eq!(sink.log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn hop_budget_stops_the_chain() {
    // a -> b -> c with a budget of 2: c is discovered at depth 0 and dropped.
    let renderer = Arc::new(ScriptedRenderer::new(vec![
        ("http://market.test/a", page("a", &["http://market.test/b"])),
        ("http://market.test/b", page("b", &["http://market.test/c"])),
        ("http://market.test/c", page("c", &[])),
    ]));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config("http://market.test/a", 2, 2),
        renderer.clone(),
        sink.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.visited, 2);
    let rendered = renderer.rendered_urls();
    assert!(rendered.contains(&"http://market.test/a".to_string()));
    assert!(rendered.contains(&"http://market.test/b".to_string()));
    assert!(!rendered.contains(&"http://market.test/c".to_string()));
}

#[tokio::test]
async fn diamond_graph_logs_each_url_once() {
    // a links to b and c; both link to d. d must be visited and logged once.
    let renderer = Arc::new(ScriptedRenderer::new(vec![
        (
            "http://market.test/a",
            page("a", &["http://market.test/b", "http://market.test/c"]),
        ),
        ("http://market.test/b", page("b", &["http://market.test/d"])),
        ("http://market.test/c", page("c", &["http://market.test/d"])),
        ("http://market.test/d", page("d", &[])),
    ]));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config("http://market.test/a", 3, 4),
        renderer.clone(),
        sink.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.visited, 4);
    let log = sink.log.lock().unwrap();
    assert_eq!(log.len(), 4);
    let mut urls: Vec<&str> = log.iter().map(|e| e.url.as_str()).collect();
    urls.sort_unstable();
    urls.dedup();
    assert_eq!(urls.len(), 4, "no URL may be logged twice");
}

#[tokio::test]
async fn failed_render_logs_once_and_records_nothing() {
    let seed = "http://market.test/";
    let renderer = Arc::new(ScriptedRenderer::new(vec![(seed, Script::Timeout)]));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config(seed, 3, 2),
        renderer,
        sink.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.visited, 1);
    assert_eq!(summary.failed, 1);
    assert!(sink.results.lock().unwrap().is_empty());

    let log = sink.log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, PageStatus::Failed);
    assert!(log[0].error.as_deref().is_some_and(|e| e.contains("timed out")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_limit() {
    let fanout: Vec<String> = (0..16)
        .map(|i| format!("http://market.test/page{i}"))
        .collect();
    let mut scripts = vec![(
        "http://market.test/",
        page("hub", &fanout.iter().map(String::as_str).collect::<Vec<_>>()),
    )];
    for url in &fanout {
        scripts.push((url.as_str(), page("leaf", &[])));
    }
    let renderer = Arc::new(ScriptedRenderer::new(scripts));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config("http://market.test/", 2, 3),
        renderer.clone(),
        sink,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.visited, 17);
    assert!(
        renderer.peak_concurrency() <= 3,
        "observed {} concurrent renders with a limit of 3",
        renderer.peak_concurrency()
    );
}

#[tokio::test]
async fn keyword_pages_recorded_and_classified() {
    let renderer = Arc::new(ScriptedRenderer::new(vec![
        (
            "http://market.test/a",
            page(
                "<html><body>Pure FENTANYL, shipped fast</body></html>",
                &["http://market.test/b"],
            ),
        ),
        ("http://market.test/b", page("<p>just a forum</p>", &[])),
    ]));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config("http://market.test/a", 2, 2),
        renderer,
        sink.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.matched, 1);
    assert_eq!(summary.no_match, 1);
    assert_eq!(summary.failed, 0);

    let results = sink.results.lock().unwrap();
    let matched = results
        .iter()
        .find(|r| r.url == "http://market.test/a")
        .expect("matched page should be recorded");
    assert!(matched.matched_keywords.contains("fentanyl"));

    let log = sink.log.lock().unwrap();
    let status_of = |url: &str| {
        log.iter()
            .find(|e| e.url == url)
            .map(|e| e.status)
            .expect("every visit must be logged")
    };
    assert_eq!(status_of("http://market.test/a"), PageStatus::Success);
    assert_eq!(status_of("http://market.test/b"), PageStatus::NoMatch);
}

#[tokio::test]
async fn shutdown_flag_stops_dispatch() {
    // Pre-set shutdown: the seed is enqueued but nothing may be dispatched.
    let renderer = Arc::new(ScriptedRenderer::new(vec![(
        "http://market.test/",
        page("hub", &[]),
    )]));
    let sink = Arc::new(MemorySink::default());

    let summary = crawl_pages(
        &config("http://market.test/", 2, 2),
        renderer.clone(),
        sink.clone(),
        Arc::new(AtomicBool::new(true)),
    )
    .await
    .expect("crawl should complete");

    assert_eq!(summary.visited, 0);
    assert!(renderer.rendered_urls().is_empty());
    assert!(sink.log.lock().unwrap().is_empty());
}
