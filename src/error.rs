//! Error taxonomy for capture operations.
//!
//! Fatal errors unwind to the pipeline boundary and surface as a failed
//! capture. Per-asset fetch failures are deliberately *not* represented here:
//! they are logged warnings inside the fetch orchestrator and the asset is
//! simply absent from the asset map afterwards.

use thiserror::Error;

/// Errors that abort a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The target URL could not be parsed or uses an unsupported scheme.
    /// Raised before any I/O happens.
    #[error("invalid URL `{0}`")]
    InvalidUrl(String),

    /// Navigation, scrolling, or markup extraction failed in the rendering
    /// session. The session is still torn down by the pipeline.
    #[error("render failure: {0}")]
    Render(String),

    /// The capture was cancelled between pipeline stages.
    #[error("capture was cancelled")]
    Cancelled,

    /// Filesystem error while laying out the output tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, with its full context chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias for Result with `CaptureError`.
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Wrap a rendering-session error, keeping the anyhow context chain.
    pub fn render(err: anyhow::Error) -> Self {
        Self::Render(format!("{err:#}"))
    }
}
