//! Chromium launch plumbing.
//!
//! Finds a system Chromium/Chrome executable and launches it headless with
//! the configured SOCKS proxy so every page load is routed through Tor.
//! The CDP handler task is spawned here and must be aborted by the caller
//! after the browser is closed.

use anyhow::{Context, Result, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use log::{error, info, trace, warn};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};

use crate::config::TrawlConfig;

/// Find a Chrome/Chromium executable on the system.
///
/// `CHROMIUM_PATH` overrides everything; otherwise common install paths are
/// probed, then `which`. There is no managed download fallback — a crawler
/// routed through Tor should not be fetching binaries over the clearnet.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let paths = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for path_str in paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(output) = Command::new("which").arg(cmd).output()
            && output.status.success()
        {
            let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path_str.is_empty() {
                let path = PathBuf::from(path_str);
                info!("Found browser via 'which': {}", path.display());
                return Ok(path);
            }
        }
    }

    Err(anyhow!(
        "Chrome/Chromium executable not found; set CHROMIUM_PATH to point at one"
    ))
}

/// Launch Chromium configured for proxied crawling.
///
/// Returns the browser, the handler task driving the CDP connection, and the
/// profile directory that should be removed once the browser is closed.
pub async fn launch_browser(config: &TrawlConfig) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let chrome_path = find_browser_executable()?;

    let user_data_dir = std::env::temp_dir().join(format!("tortrawl_{}", std::process::id()));
    std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;

    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(config.render_timeout_secs))
        .window_size(1280, 900)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);

    if config.headless() {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    if let Some(proxy) = config.proxy() {
        info!("Routing browser traffic through proxy {proxy}");
        config_builder = config_builder.arg(format!("--proxy-server={proxy}"));
    } else {
        warn!("No proxy configured; pages will be fetched over a direct connection");
    }

    config_builder = config_builder
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--metrics-recording-only")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let msg = e.to_string();
                // Chrome emits CDP events chromiumoxide cannot deserialize;
                // those are noise, not failures.
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if benign {
                    trace!("Suppressed benign CDP serialization error: {msg}");
                } else {
                    error!("Browser handler error: {e:?}");
                }
            }
        }
        info!("Browser handler task completed");
    });

    Ok((browser, handler_task, user_data_dir))
}
