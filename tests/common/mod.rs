//! Scripted stand-ins for the rendering session and fetch transport.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use sitemirror::{FetchResponse, FetchTransport, Navigation, NetworkIdle, RenderingSession};

/// Rendering session that replays a scripted height sequence and fixed
/// markup. Shared counters survive the session being consumed by `capture`.
pub struct ScriptedSession {
    pub final_url: String,
    pub html: String,
    pub idle: NetworkIdle,
    heights: Vec<u64>,
    probe_index: usize,
    pub probes: Arc<AtomicUsize>,
    pub navigations: Arc<AtomicUsize>,
    pub scrolls: Arc<Mutex<Vec<u64>>>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedSession {
    pub fn new(final_url: &str, html: &str) -> Self {
        Self {
            final_url: final_url.to_string(),
            html: html.to_string(),
            idle: NetworkIdle::Idle,
            heights: vec![100],
            probe_index: 0,
            probes: Arc::new(AtomicUsize::new(0)),
            navigations: Arc::new(AtomicUsize::new(0)),
            scrolls: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_heights(mut self, heights: Vec<u64>) -> Self {
        self.heights = heights;
        self
    }
}

impl RenderingSession for ScriptedSession {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<Navigation> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        Ok(Navigation {
            final_url: self.final_url.clone(),
            status: Some(200),
        })
    }

    async fn probe_height(&mut self) -> Result<u64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let idx = self.probe_index.min(self.heights.len().saturating_sub(1));
        self.probe_index += 1;
        Ok(self.heights.get(idx).copied().unwrap_or(0))
    }

    async fn scroll_to(&mut self, y: u64) -> Result<()> {
        self.scrolls.lock().expect("scroll lock").push(y);
        Ok(())
    }

    async fn wait_network_idle(&mut self, _timeout: Duration) -> Result<NetworkIdle> {
        Ok(self.idle)
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn close(self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport serving canned responses; unknown URLs get a 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, FetchResponse>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, content_type: &str, body: &[u8]) -> Self {
        self.routes.insert(
            url.to_string(),
            FetchResponse {
                status,
                content_type: Some(content_type.to_string()),
                body: Bytes::copy_from_slice(body),
            },
        );
        self
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requests
            .lock()
            .expect("request lock")
            .iter()
            .any(|r| r == url)
    }
}

impl FetchTransport for FakeTransport {
    async fn get(&self, url: &str, _referer: &str, _timeout: Duration) -> Result<FetchResponse> {
        self.requests
            .lock()
            .expect("request lock")
            .push(url.to_string());
        Ok(self.routes.get(url).cloned().unwrap_or(FetchResponse {
            status: 404,
            content_type: None,
            body: Bytes::new(),
        }))
    }
}
