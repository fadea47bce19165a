//! Progress events and the sink interface the pipeline reports through.
//!
//! The pipeline never talks to a transport or a job registry directly: it
//! emits [`CaptureEvent`]s into an injected [`EventSink`]. Sinks decide where
//! the events go — the process log, an in-memory job record, an external
//! streaming channel, or all of them via [`FanoutSink`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse event category, mirrored into log levels by [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Stage transitions of the capture pipeline.
    Pipeline,
    /// Per-asset network activity.
    Network,
    /// Non-fatal degradation (failed asset, soft timeout).
    Warning,
    /// Fatal capture failure.
    Error,
    /// Terminal success event carrying the outcome.
    Complete,
}

/// One progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub category: EventCategory,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Structured payload for events that carry more than a message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl CaptureEvent {
    #[must_use]
    pub fn new(category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            timestamp: Utc::now(),
            detail: None,
        }
    }

    #[must_use]
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::new(EventCategory::Pipeline, message)
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(EventCategory::Network, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventCategory::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventCategory::Error, message)
    }

    #[must_use]
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(EventCategory::Complete, message)
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Destination for progress events.
///
/// Emission is synchronous and must be cheap; sinks that need to do real work
/// should hand the event off (channel, queue) rather than block the pipeline.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CaptureEvent);
}

/// Forwards events to the process log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: CaptureEvent) {
        match event.category {
            EventCategory::Warning => log::warn!("{}", event.message),
            EventCategory::Error => log::error!("{}", event.message),
            _ => log::info!("{}", event.message),
        }
    }
}

/// Discards every event. Useful in tests and embedded use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CaptureEvent) {}
}

/// Broadcasts each event to every registered sink.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: CaptureEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<CaptureEvent>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: CaptureEvent) {
            self.0.lock().expect("sink lock").push(event);
        }
    }

    #[test]
    fn constructors_set_category() {
        assert_eq!(CaptureEvent::pipeline("x").category, EventCategory::Pipeline);
        assert_eq!(CaptureEvent::warning("x").category, EventCategory::Warning);
        assert_eq!(CaptureEvent::complete("x").category, EventCategory::Complete);
    }

    #[test]
    fn detail_round_trips_through_serde() {
        let event = CaptureEvent::complete("done")
            .with_detail(serde_json::json!({"assetCount": 3}));
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("assetCount"));
        let back: CaptureEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.message, "done");
    }

    #[test]
    fn detail_is_omitted_when_absent() {
        let json = serde_json::to_string(&CaptureEvent::pipeline("x")).expect("serialize");
        assert!(!json.contains("detail"));
    }

    #[test]
    fn fanout_delivers_to_all_sinks() {
        let a = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let b = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let fanout = FanoutSink::new(vec![a.clone(), b.clone()]);
        fanout.emit(CaptureEvent::network("fetched"));
        assert_eq!(a.0.lock().expect("lock").len(), 1);
        assert_eq!(b.0.lock().expect("lock").len(), 1);
    }
}
