//! HTTP transport seam for asset downloads.
//!
//! The orchestrator only sees the [`FetchTransport`] trait, so tests swap in
//! a scripted transport and the production build uses [`HttpTransport`] over
//! a shared reqwest client with streamed, size-capped bodies.

use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, REFERER, USER_AGENT};

/// Hard cap on a single asset body. Bigger responses are treated as fetch
/// failures rather than buffered into memory.
pub const MAX_ASSET_SIZE: usize = 25 * 1024 * 1024;

/// Response surface the orchestrator needs: status, observed content-type,
/// and the full body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to GET a URL on behalf of a page.
pub trait FetchTransport {
    /// Fetch `url` with the page's final URL as Referer. Transport-level
    /// failures (DNS, connect, timeout, oversized body) are errors; an HTTP
    /// error status is a normal response the caller inspects.
    fn get(
        &self,
        url: &str,
        referer: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<FetchResponse>>;
}

/// Production transport over reqwest with browser-like headers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl FetchTransport for HttpTransport {
    async fn get(&self, url: &str, referer: &str, timeout: Duration) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, referer)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .with_context(|| format!("request failed for {url}"))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Enforce the size cap before buffering when the server declares it.
        if let Some(expected) = response.content_length()
            && expected > MAX_ASSET_SIZE as u64
        {
            anyhow::bail!("asset too large: {expected} bytes from {url}");
        }

        let mut buffer = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("failed to read body chunk from {url}"))?;
            if buffer.len() + chunk.len() > MAX_ASSET_SIZE {
                anyhow::bail!("asset exceeded size cap during download: {url}");
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(FetchResponse {
            status,
            content_type,
            body: Bytes::from(buffer),
        })
    }
}
