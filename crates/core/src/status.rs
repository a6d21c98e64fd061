//! Job status vocabulary shared with the composer service.
//!
//! The service reports status as a lowercase string in the
//! `GET /status/{job_id}` response body.  `generating` and `finished` are
//! never sent by the service -- they are entered client-side during the
//! separate generation request.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a training/generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// No status has been reported yet.
    Unset,
    /// The job has been accepted and is waiting to start.
    Starting,
    /// The uploaded files are being preprocessed.
    Processing,
    /// The model is training.
    Training,
    /// Training finished successfully; an artifact can be generated.
    Complete,
    /// Training (or generation) failed.
    Failed,
    /// A generation request is in flight (client-local).
    Generating,
    /// The artifact has been retrieved (client-local).
    Finished,
}

impl JobStatus {
    /// Whether this status ends the polling phase.
    ///
    /// Once a poll response carries a terminal status, no further status
    /// requests are issued for the job.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    /// Whether the job is still being worked on by the service.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            JobStatus::Starting | JobStatus::Processing | JobStatus::Training
        )
    }

    /// The lowercase wire form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Unset => "unset",
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Training => "training",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Generating => "generating",
            JobStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_strings() {
        let status: JobStatus = serde_json::from_str("\"training\"").unwrap();
        assert_eq!(status, JobStatus::Training);

        let status: JobStatus = serde_json::from_str("\"complete\"").unwrap();
        assert_eq!(status, JobStatus::Complete);
    }

    #[test]
    fn unknown_wire_string_is_an_error() {
        let result = serde_json::from_str::<JobStatus>("\"exploded\"");
        assert!(result.is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Training.is_terminal());
        assert!(!JobStatus::Unset.is_terminal());
    }

    #[test]
    fn in_flight_statuses_keep_polling() {
        for status in [
            JobStatus::Starting,
            JobStatus::Processing,
            JobStatus::Training,
        ] {
            assert!(status.is_in_flight());
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\"",
        );
    }
}
