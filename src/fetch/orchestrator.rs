//! Fetch orchestration: bounded-concurrency downloads, the asset map, and
//! the second-pass scan of downloaded stylesheets.
//!
//! Per-asset failures never abort a capture. A failed download is logged,
//! reported as a warning event, and leaves the asset map untouched, so the
//! rewriter later degrades that reference to its original absolute URL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::join_all;

use crate::asset_url::{AssetCategory, asset_local_path, is_data_url, resolve};
use crate::css_scan::extract_css_urls;
use crate::discovery::DiscoveredAsset;
use crate::error::CaptureResult;
use crate::events::{CaptureEvent, EventSink};
use crate::fetch::transport::FetchTransport;
use crate::pipeline::CancelToken;
use crate::rewrite::rewrite_stylesheet;

/// Mapping from source URLs — and from each original reference text — to
/// local relative paths.
///
/// Every key present points at a file already written into the output tree;
/// failed fetches leave their keys absent. Data-URIs are never keys.
#[derive(Debug, Default, Clone)]
pub struct AssetMap {
    entries: HashMap<String, String>,
}

impl AssetMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fetched asset under both its resolved URL and the reference
    /// text it was discovered through.
    pub fn insert(&mut self, resolved_url: &str, original_ref: &str, local_path: &str) {
        self.entries
            .insert(resolved_url.to_string(), local_path.to_string());
        if original_ref != resolved_url {
            self.entries
                .insert(original_ref.to_string(), local_path.to_string());
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Entries sorted by key length descending, so a short URL that is a
    /// substring of a longer one never corrupts the longer one's occurrences.
    #[must_use]
    pub fn entries_longest_first(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A downloaded stylesheet held back for the second pass.
#[derive(Debug, Clone)]
pub struct StylesheetRecord {
    pub url: String,
    pub text: String,
    pub local_path: String,
}

struct FetchedAsset {
    resolved_url: String,
    original_ref: String,
    local_path: String,
    category: AssetCategory,
    stylesheet_text: Option<String>,
}

/// Owns the asset map and drives all downloads for one capture.
pub struct AssetFetcher<'a, T: FetchTransport> {
    transport: &'a T,
    sink: &'a dyn EventSink,
    output_dir: PathBuf,
    referer: String,
    fetch_timeout: Duration,
    batch_size: usize,
    asset_map: AssetMap,
    stylesheets: Vec<StylesheetRecord>,
    fetched: usize,
}

impl<'a, T: FetchTransport> AssetFetcher<'a, T> {
    pub fn new(
        transport: &'a T,
        sink: &'a dyn EventSink,
        output_dir: &Path,
        page_final_url: &str,
        fetch_timeout: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            transport,
            sink,
            output_dir: output_dir.to_path_buf(),
            referer: page_final_url.to_string(),
            fetch_timeout,
            batch_size: batch_size.max(1),
            asset_map: AssetMap::new(),
            stylesheets: Vec::new(),
            fetched: 0,
        }
    }

    #[must_use]
    pub fn asset_map(&self) -> &AssetMap {
        &self.asset_map
    }

    /// Number of distinct source URLs successfully downloaded.
    #[must_use]
    pub fn fetched_count(&self) -> usize {
        self.fetched
    }

    /// Download the discovered assets in fixed-size batches: concurrent
    /// within a batch, batches sequential.
    pub async fn fetch_all(
        &mut self,
        assets: &[DiscoveredAsset],
        cancel: &CancelToken,
    ) -> CaptureResult<()> {
        let total = assets.len();
        let mut done = 0usize;

        for batch in assets.chunks(self.batch_size) {
            cancel.ensure_active()?;
            let this = &*self;
            let results = join_all(
                batch
                    .iter()
                    .map(|asset| this.fetch_one(&asset.url, &asset.original_ref)),
            )
            .await;

            for result in results {
                if let Some(fetched) = result? {
                    self.record(fetched);
                }
            }

            done += batch.len();
            self.sink.emit(CaptureEvent::pipeline(format!(
                "downloaded {done}/{total} assets"
            )));
        }
        Ok(())
    }

    /// Second pass: scan each downloaded stylesheet for nested `url()`
    /// references, fetch the new ones, and rewrite the stylesheet on disk so
    /// its references point at the local copies.
    pub async fn process_stylesheets(&mut self, cancel: &CancelToken) -> CaptureResult<()> {
        let sheets = std::mem::take(&mut self.stylesheets);

        for sheet in sheets {
            cancel.ensure_active()?;
            for raw in extract_css_urls(&sheet.text) {
                // Nested references resolve against the stylesheet itself,
                // not the page; dedup is on the resolved URL only, since the
                // same reference text in two stylesheets can name two
                // distinct resources.
                let resolved = resolve(&sheet.url, &raw);
                if is_data_url(&resolved) || self.asset_map.contains(&resolved) {
                    continue;
                }
                if let Some(fetched) = self.fetch_one(&resolved, &raw).await? {
                    self.record(fetched);
                }
            }

            let rewritten = rewrite_stylesheet(&sheet.text, &sheet.local_path, &self.asset_map);
            tokio::fs::write(self.output_dir.join(&sheet.local_path), rewritten).await?;
        }

        // Stylesheets discovered during the second pass get exactly one hop:
        // they are fetched and rewritable by the markup pass, but not
        // re-scanned.
        self.stylesheets.clear();
        Ok(())
    }

    /// Fetch one asset and write it into the output tree.
    ///
    /// Returns `Ok(None)` on the non-fatal failures (transport error,
    /// non-success status); only filesystem errors propagate.
    async fn fetch_one(
        &self,
        resolved_url: &str,
        original_ref: &str,
    ) -> CaptureResult<Option<FetchedAsset>> {
        let response = match self
            .transport
            .get(resolved_url, &self.referer, self.fetch_timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("error downloading {resolved_url}: {e:#}");
                self.sink.emit(CaptureEvent::warning(format!(
                    "error downloading {resolved_url}"
                )));
                return Ok(None);
            }
        };

        if !response.is_success() {
            log::warn!("failed to download {resolved_url} ({})", response.status);
            self.sink.emit(CaptureEvent::warning(format!(
                "failed to download {resolved_url} ({})",
                response.status
            )));
            return Ok(None);
        }

        // The observed content-type may override the URL-based category.
        let content_type = response.content_type.as_deref();
        let (category, local_path) = asset_local_path(resolved_url, content_type);

        let full_path = self.output_dir.join(&local_path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &response.body).await?;

        let stylesheet_text = if category == AssetCategory::Stylesheet {
            Some(String::from_utf8_lossy(&response.body).into_owned())
        } else {
            None
        };

        self.sink.emit(CaptureEvent::network(format!(
            "saved {} ({})",
            local_path,
            category.dir_name()
        )));

        Ok(Some(FetchedAsset {
            resolved_url: resolved_url.to_string(),
            original_ref: original_ref.to_string(),
            local_path,
            category,
            stylesheet_text,
        }))
    }

    fn record(&mut self, fetched: FetchedAsset) {
        log::debug!(
            "mapped {} -> {} ({})",
            fetched.resolved_url,
            fetched.local_path,
            fetched.category.dir_name()
        );
        self.asset_map
            .insert(&fetched.resolved_url, &fetched.original_ref, &fetched.local_path);
        self.fetched += 1;

        if let Some(text) = fetched.stylesheet_text {
            self.stylesheets.push(StylesheetRecord {
                url: fetched.resolved_url,
                text,
                local_path: fetched.local_path,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_map_orders_longest_first() {
        let mut map = AssetMap::new();
        map.insert("https://x.test/a", "https://x.test/a", "assets/other/a1");
        map.insert("https://x.test/a/longer.png", "/a/longer.png", "assets/images/a2.png");
        let keys: Vec<&str> = map.entries_longest_first().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys[0], "https://x.test/a/longer.png");
        assert_eq!(*keys.last().expect("entries"), "/a/longer.png");
    }

    #[test]
    fn asset_map_shares_one_path_across_reference_forms() {
        let mut map = AssetMap::new();
        map.insert("https://x.test/a.png", "../a.png", "assets/images/x.png");
        assert_eq!(map.get("https://x.test/a.png"), Some("assets/images/x.png"));
        assert_eq!(map.get("../a.png"), Some("assets/images/x.png"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn identical_forms_insert_once() {
        let mut map = AssetMap::new();
        map.insert("https://x.test/a.png", "https://x.test/a.png", "assets/images/x.png");
        assert_eq!(map.len(), 1);
    }
}
