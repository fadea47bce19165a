//! In-memory capture job bookkeeping.
//!
//! The job store is owned by the embedding application, not by the pipeline:
//! the core stages know nothing about jobs and report only through an
//! [`EventSink`]. [`JobSink`] is the adapter that appends those events to a
//! job's ordered log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{CaptureEvent, EventSink};
use crate::pipeline::CaptureOutcome;

/// Lifecycle of a capture job. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// One capture request and everything observed while serving it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureJob {
    pub id: Uuid,
    pub target_url: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Ordered progress log, appended by [`JobSink`].
    pub logs: Vec<CaptureEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CaptureOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Memory-resident registry of capture jobs keyed by id.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, CaptureJob>,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running job and return its id.
    pub fn create(&self, target_url: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.insert(
            id,
            CaptureJob {
                id,
                target_url: target_url.to_string(),
                status: JobStatus::Running,
                started_at: Utc::now(),
                finished_at: None,
                logs: Vec::new(),
                result: None,
                error: None,
            },
        );
        id
    }

    pub fn append_log(&self, id: Uuid, event: CaptureEvent) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.logs.push(event);
        }
    }

    pub fn complete(&self, id: Uuid, outcome: CaptureOutcome) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.status = JobStatus::Completed;
            job.result = Some(outcome);
            job.finished_at = Some(Utc::now());
        }
    }

    pub fn fail(&self, id: Uuid, error: String) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.finished_at = Some(Utc::now());
        }
    }

    /// Snapshot of a job, if it exists.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<CaptureJob> {
        self.jobs.get(&id).map(|job| job.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Event sink that appends every pipeline event to one job's log.
pub struct JobSink {
    store: Arc<JobStore>,
    job_id: Uuid,
}

impl JobSink {
    #[must_use]
    pub fn new(store: Arc<JobStore>, job_id: Uuid) -> Self {
        Self { store, job_id }
    }
}

impl EventSink for JobSink {
    fn emit(&self, event: CaptureEvent) {
        self.store.append_log(self.job_id, event);
    }
}
