//! Capture configuration.
//!
//! Built once per capture through the fluent builder; every timeout and
//! bound the pipeline uses lives here so tests can shrink delays to zero.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::ScrollConfig;

/// Chrome-like user agent sent by both the rendering session and the asset
/// transport, so asset servers see the same client the page did.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for one capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub(crate) output_root: PathBuf,
    pub(crate) headless: bool,
    pub(crate) user_agent: String,
    /// Assets fetched concurrently per batch; batches run sequentially.
    pub(crate) batch_size: usize,
    pub(crate) navigation_timeout: Duration,
    pub(crate) fetch_timeout: Duration,
    /// Soft bound on the network-idle wait; expiry is tolerated.
    pub(crate) idle_timeout: Duration,
    /// Pause after the initial load before scrolling, for hydration.
    pub(crate) settle_delay: Duration,
    pub(crate) scroll: ScrollConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            batch_size: 10,
            navigation_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            scroll: ScrollConfig::default(),
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    #[must_use]
    pub fn scroll(&self) -> &ScrollConfig {
        &self.scroll
    }
}

/// Fluent builder for [`CaptureConfig`].
#[derive(Debug, Default)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    #[must_use]
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.output_root = root.into();
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.config.navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn scroll(mut self, scroll: ScrollConfig) -> Self {
        self.config.scroll = scroll;
        self
    }

    #[must_use]
    pub fn build(self) -> CaptureConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let config = CaptureConfig::default();
        assert_eq!(config.batch_size(), 10);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.idle_timeout(), Duration::from_secs(10));
        assert_eq!(config.scroll().max_iterations, 20);
        assert_eq!(config.scroll().stable_readings, 3);
    }

    #[test]
    fn builder_overrides_and_clamps() {
        let config = CaptureConfig::builder()
            .output_root("/tmp/captures")
            .headless(false)
            .batch_size(0)
            .settle_delay(Duration::ZERO)
            .build();
        assert_eq!(config.output_root(), Path::new("/tmp/captures"));
        assert!(!config.headless());
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.settle_delay(), Duration::ZERO);
    }
}
