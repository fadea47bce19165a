//! Rendering session seam and the lazy-load auto-scroll routine.
//!
//! The pipeline drives a page through the [`RenderingSession`] trait only;
//! [`chromium::ChromiumSession`] is the production implementation and tests
//! script a fake. Auto-scrolling lives here because it is pure session
//! choreography: probe, scroll, wait, repeat until the height stabilizes.

pub mod chromium;

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Result of navigating the session to a URL.
#[derive(Debug, Clone)]
pub struct Navigation {
    /// URL after redirects; the base for all reference resolution.
    pub final_url: String,
    /// HTTP status of the main document, when the engine exposes it.
    pub status: Option<u16>,
}

/// Outcome of waiting for the network to go quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkIdle {
    Idle,
    /// The wait is soft: a timeout is tolerated and the capture continues.
    TimedOut,
}

/// A live page owned exclusively by one capture for its full lifetime.
#[allow(async_fn_in_trait)]
pub trait RenderingSession {
    /// Navigate and wait for the initial load, bounded by `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<Navigation>;

    /// Current document height in CSS pixels.
    async fn probe_height(&mut self) -> Result<u64>;

    /// Scroll the viewport to vertical offset `y`.
    async fn scroll_to(&mut self, y: u64) -> Result<()>;

    /// Wait until no network activity is observed, up to `timeout`.
    async fn wait_network_idle(&mut self, timeout: Duration) -> Result<NetworkIdle>;

    /// Serialized markup of the current DOM.
    async fn content(&mut self) -> Result<String>;

    /// Tear the session down. Called unconditionally by the pipeline.
    async fn close(self) -> Result<()>;
}

/// Auto-scroll tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Upper bound on scroll iterations; keeps infinite-scroll pages finite.
    pub max_iterations: u32,
    /// Consecutive equal height readings required to consider the page
    /// stabilized.
    pub stable_readings: u32,
    /// Delay between iterations, giving lazy loaders time to fire.
    pub delay: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            stable_readings: 3,
            delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ScrollState {
    Scrolling,
    Stabilized,
}

/// Scroll to the bottom repeatedly until the document height stops growing,
/// then return to the top so extraction sees the page from its start.
///
/// Returns the last observed height.
pub async fn auto_scroll<S: RenderingSession>(
    session: &mut S,
    config: &ScrollConfig,
) -> Result<u64> {
    let mut state = ScrollState::Scrolling;
    let mut last_height = 0u64;
    let mut stable = 0u32;

    for iteration in 0..config.max_iterations {
        let height = session.probe_height().await?;

        if height == last_height {
            stable += 1;
            if stable >= config.stable_readings {
                log::debug!("scroll complete, height stabilized at {height}px");
                state = ScrollState::Stabilized;
                break;
            }
        } else {
            stable = 0;
        }
        last_height = height;

        session.scroll_to(height).await?;
        tokio::time::sleep(config.delay).await;
        log::debug!("scrolled to bottom (height {height}px, iteration {})", iteration + 1);
    }

    if state == ScrollState::Scrolling {
        log::debug!(
            "scroll stopped after {} iterations without stabilizing",
            config.max_iterations
        );
    }

    session.scroll_to(0).await?;
    Ok(last_height)
}
