//! sitemirror: capture live web pages as self-contained offline replicas.
//!
//! The core is an asset-discovery-and-rewrite pipeline. Given a rendered
//! document and a fetch capability it discovers every referenced asset,
//! downloads each exactly once, names it deterministically, and rewrites all
//! references — in the markup and inside downloaded stylesheets — to the
//! local copy. The rendering engine and the asset transport sit behind
//! traits so the pipeline itself never touches a browser or the network.

pub mod asset_url;
pub mod config;
pub mod css_scan;
pub mod discovery;
pub mod error;
pub mod events;
pub mod fetch;
pub mod jobs;
pub mod pipeline;
pub mod render;
pub mod rewrite;

pub use asset_url::AssetCategory;
pub use config::CaptureConfig;
pub use discovery::{DiscoveredAsset, discover_assets};
pub use error::{CaptureError, CaptureResult};
pub use events::{CaptureEvent, EventCategory, EventSink, FanoutSink, LogSink, NullSink};
pub use fetch::{AssetFetcher, AssetMap, FetchResponse, FetchTransport, HttpTransport};
pub use jobs::{CaptureJob, JobSink, JobStatus, JobStore};
pub use pipeline::{CancelToken, CaptureOutcome, capture};
pub use render::chromium::ChromiumSession;
pub use render::{Navigation, NetworkIdle, RenderingSession, ScrollConfig, auto_scroll};
pub use rewrite::{rewrite_markup, rewrite_stylesheet};
