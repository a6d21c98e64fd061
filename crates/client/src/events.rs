//! Session events emitted by the job lifecycle client.
//!
//! High-level state changes a front-end cares about, broadcast via a
//! [`tokio::sync::broadcast`] channel.  Subscribe through
//! [`JobSession::subscribe`](crate::session::JobSession::subscribe).

use serde::Serialize;

use cadenza_core::status::JobStatus;

/// A session-level event originating from the job lifecycle client.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    /// The service accepted a submission and issued a job id.
    JobSubmitted { job_id: String, message: String },

    /// The submission request failed.
    SubmitFailed {
        /// Underlying cause, for logging/diagnostics only.
        error: String,
    },

    /// A poll response reported a (possibly unchanged) status.
    StatusChanged {
        job_id: String,
        status: JobStatus,
        message: String,
    },

    /// Polling exhausted its retry policy and gave up on the job.
    PollGaveUp { job_id: String, error: String },

    /// A stop signal was sent to the service for this job.
    StopRequested { job_id: String },

    /// The generated composition was retrieved.
    ArtifactReady {
        job_id: String,
        /// Artifact size in bytes.
        size: usize,
    },

    /// The generation request failed.
    GenerateFailed { job_id: String, error: String },
}
