//! The capture pipeline: one end-to-end run producing one static replica.
//!
//! Stages run strictly sequentially by data dependency; only asset fetches
//! inside the orchestrator are concurrent. The rendering session is released
//! unconditionally, whether the capture succeeds or fails, and a cooperative
//! cancellation token is checked between stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::asset_url::{self, output_folder_name};
use crate::config::CaptureConfig;
use crate::discovery::discover_assets;
use crate::error::{CaptureError, CaptureResult};
use crate::events::{CaptureEvent, EventSink};
use crate::fetch::{AssetFetcher, FetchTransport};
use crate::render::{NetworkIdle, RenderingSession, auto_scroll};
use crate::rewrite::rewrite_markup;

/// Cooperative cancellation signal for an in-flight capture.
///
/// Checked between pipeline stages and before each fetch batch; cancellation
/// is not preemptive, so a stage already running completes first.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn ensure_active(&self) -> CaptureResult<()> {
        if self.is_cancelled() {
            Err(CaptureError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What a successful capture produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOutcome {
    /// Capture folder name, relative to the output root.
    pub output_path: String,
    /// Entry document path, relative to the output root.
    pub entry_document: String,
    /// Distinct assets downloaded into the replica.
    pub asset_count: usize,
}

/// Run one capture of `target_url`.
///
/// The session is consumed and closed before this returns, on every path.
pub async fn capture<S, T>(
    config: &CaptureConfig,
    target_url: &str,
    session: S,
    transport: &T,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> CaptureResult<CaptureOutcome>
where
    S: RenderingSession,
    T: FetchTransport,
{
    let mut session = session;
    let result = run(config, target_url, &mut session, transport, sink, cancel).await;

    if let Err(e) = session.close().await {
        log::warn!("failed to close rendering session: {e:#}");
    }

    match result {
        Ok(outcome) => {
            sink.emit(
                CaptureEvent::complete("capture completed successfully").with_detail(
                    serde_json::json!({
                        "outputPath": outcome.output_path,
                        "entryDocument": outcome.entry_document,
                        "assetCount": outcome.asset_count,
                    }),
                ),
            );
            Ok(outcome)
        }
        Err(e) => {
            sink.emit(CaptureEvent::error(format!("capture failed: {e}")));
            Err(e)
        }
    }
}

async fn run<S, T>(
    config: &CaptureConfig,
    target_url: &str,
    session: &mut S,
    transport: &T,
    sink: &dyn EventSink,
    cancel: &CancelToken,
) -> CaptureResult<CaptureOutcome>
where
    S: RenderingSession,
    T: FetchTransport,
{
    cancel.ensure_active()?;
    sink.emit(CaptureEvent::pipeline("validating URL"));
    let base_url = asset_url::normalize(target_url)?;
    sink.emit(CaptureEvent::pipeline(format!("normalized URL: {base_url}")));

    let folder = output_folder_name(&base_url);
    let output_dir = config.output_root().join(&folder);
    for dir in ["images", "css", "js", "fonts", "other"] {
        tokio::fs::create_dir_all(output_dir.join("assets").join(dir)).await?;
    }

    cancel.ensure_active()?;
    sink.emit(CaptureEvent::pipeline("navigating to page"));
    let navigation = session
        .navigate(&base_url, config.navigation_timeout())
        .await
        .map_err(CaptureError::render)?;
    sink.emit(CaptureEvent::pipeline(format!(
        "page loaded (status: {})",
        navigation
            .status
            .map_or_else(|| "unknown".to_string(), |s| s.to_string())
    )));

    // Give client-side hydration a moment before measuring anything.
    tokio::time::sleep(config.settle_delay()).await;

    cancel.ensure_active()?;
    sink.emit(CaptureEvent::pipeline("auto-scrolling to load lazy content"));
    auto_scroll(session, config.scroll())
        .await
        .map_err(CaptureError::render)?;

    cancel.ensure_active()?;
    sink.emit(CaptureEvent::pipeline("waiting for network idle"));
    match session
        .wait_network_idle(config.idle_timeout())
        .await
        .map_err(CaptureError::render)?
    {
        NetworkIdle::Idle => {}
        NetworkIdle::TimedOut => {
            sink.emit(CaptureEvent::warning("network idle timeout, continuing anyway"));
        }
    }

    cancel.ensure_active()?;
    sink.emit(CaptureEvent::pipeline("extracting rendered markup"));
    let markup = session.content().await.map_err(CaptureError::render)?;
    sink.emit(CaptureEvent::pipeline(format!(
        "markup extracted ({} bytes)",
        markup.len()
    )));

    let assets = discover_assets(&markup, &navigation.final_url);
    sink.emit(CaptureEvent::pipeline(format!(
        "found {} assets to download",
        assets.len()
    )));

    let mut fetcher = AssetFetcher::new(
        transport,
        sink,
        &output_dir,
        &navigation.final_url,
        config.fetch_timeout(),
        config.batch_size(),
    );
    fetcher.fetch_all(&assets, cancel).await?;

    sink.emit(CaptureEvent::pipeline("processing stylesheets for nested assets"));
    fetcher.process_stylesheets(cancel).await?;

    cancel.ensure_active()?;
    sink.emit(CaptureEvent::pipeline("rewriting markup references"));
    // Re-extract: scrolling and late scripts may have changed the DOM since
    // the first snapshot.
    let markup = session.content().await.map_err(CaptureError::render)?;
    let rewritten = rewrite_markup(&markup, fetcher.asset_map());

    tokio::fs::write(output_dir.join("index.html"), rewritten).await?;
    sink.emit(CaptureEvent::pipeline("saved entry document"));

    Ok(CaptureOutcome {
        output_path: folder.clone(),
        entry_document: format!("{folder}/index.html"),
        asset_count: fetcher.fetched_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_trips_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.ensure_active().is_ok());
        token.cancel();
        assert!(matches!(token.ensure_active(), Err(CaptureError::Cancelled)));

        // Clones observe the same signal.
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }
}
