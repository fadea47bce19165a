//! Chromium-backed rendering session via the Chrome DevTools Protocol.
//!
//! Owns one browser process, its CDP handler task, and one page for the
//! lifetime of a capture. Height probing, scrolling, and the network-idle
//! wait are all done with small JS evaluations so the session trait stays
//! engine-agnostic.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use tokio::task::{self, JoinHandle};

use super::{Navigation, NetworkIdle, RenderingSession};
use crate::config::CaptureConfig;

const HEIGHT_SCRIPT: &str = "document.body ? document.body.scrollHeight : 0";
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// A live Chromium page exclusively owned by one capture.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch a browser and open a blank page, ready to navigate.
    pub async fn launch(config: &CaptureConfig) -> Result<Self> {
        let user_data_dir =
            std::env::temp_dir().join(format!("sitemirror_chrome_{}", std::process::id()));
        std::fs::create_dir_all(&user_data_dir)
            .context("failed to create browser user data directory")?;

        let mut builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(1366, 768)
            .user_data_dir(user_data_dir)
            .arg(format!("--user-agent={}", config.user_agent()))
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-web-security")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        // An explicit executable wins over chromiumoxide's own detection.
        if let Ok(path) = std::env::var("CHROMIUM_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                log::info!("using browser from CHROMIUM_PATH: {}", path.display());
                builder = builder.chrome_executable(path);
            } else {
                log::warn!(
                    "CHROMIUM_PATH points at a non-existent file: {}",
                    path.display()
                );
            }
        }

        builder = if config.headless() {
            builder.headless_mode(HeadlessMode::default())
        } else {
            builder.with_head()
        };

        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch browser")?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let msg = e.to_string();
                    // Chrome emits CDP events chromiumoxide cannot always
                    // deserialize; those are not actionable.
                    if msg.contains("data did not match any variant of untagged enum Message") {
                        log::trace!("suppressed CDP deserialization error: {msg}");
                    } else {
                        log::error!("browser handler error: {msg}");
                    }
                }
            }
            log::debug!("browser handler task finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    async fn evaluate_u64(&self, script: &str) -> Result<u64> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("script evaluation failed: {e}"))?;
        let value: f64 = result
            .into_value()
            .map_err(|e| anyhow!("unexpected script result: {e}"))?;
        Ok(value.max(0.0) as u64)
    }
}

impl RenderingSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<Navigation> {
        tokio::time::timeout(timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| anyhow!("navigation failed: {e}"))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| anyhow!("page load failed: {e}"))?;
            Ok::<(), anyhow::Error>(())
        })
        .await
        .map_err(|_| anyhow!("navigation timed out after {}s", timeout.as_secs()))??;

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        // The CDP navigation API does not surface the main document's HTTP
        // status; report it as unknown.
        Ok(Navigation {
            final_url,
            status: None,
        })
    }

    async fn probe_height(&mut self) -> Result<u64> {
        self.evaluate_u64(HEIGHT_SCRIPT).await
    }

    async fn scroll_to(&mut self, y: u64) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollTo(0, {y})"))
            .await
            .map_err(|e| anyhow!("scroll failed: {e}"))?;
        Ok(())
    }

    async fn wait_network_idle(&mut self, timeout: Duration) -> Result<NetworkIdle> {
        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(250);
        let mut last_count = u64::MAX;
        let mut stable = 0u32;

        while Instant::now() < deadline {
            let count = self.evaluate_u64(RESOURCE_COUNT_SCRIPT).await?;
            if count == last_count {
                stable += 1;
                if stable >= 2 {
                    return Ok(NetworkIdle::Idle);
                }
            } else {
                stable = 0;
                last_count = count;
            }
            tokio::time::sleep(poll).await;
        }
        Ok(NetworkIdle::TimedOut)
    }

    async fn content(&mut self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("failed to extract page content: {e}"))
    }

    async fn close(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            log::warn!("failed to close browser: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            log::warn!("failed to wait for browser exit: {e}");
        }
        self.handler_task.abort();
        Ok(())
    }
}
