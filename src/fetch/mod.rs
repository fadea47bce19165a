//! Asset fetching: the transport seam and the orchestrator built on it.

pub mod orchestrator;
pub mod transport;

pub use orchestrator::{AssetFetcher, AssetMap, StylesheetRecord};
pub use transport::{FetchResponse, FetchTransport, HttpTransport};
