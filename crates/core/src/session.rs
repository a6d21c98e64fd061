//! Pure session state machine for the job lifecycle.
//!
//! All controller state lives in a [`SessionState`] value and is advanced
//! exclusively by [`reduce`], a pure function over `(state, action)`.  The
//! I/O layer (`cadenza-client`) produces [`Action`]s from user intent and
//! remote responses; nothing else mutates session state.  Actions that do
//! not fit the current phase leave the state unchanged, which also shields
//! the session from late responses arriving after a job has been replaced.

use serde::Serialize;

use crate::status::JobStatus;

/// Fixed display message when the submission request fails.
pub const SUBMIT_FAILED_NOTICE: &str =
    "Failed to start training. Check that the composer service is reachable.";
/// Fixed display message when polling gives up on a job.
pub const POLL_FAILED_NOTICE: &str = "Lost contact with the training job.";
/// Fixed display message when the generation request fails.
pub const GENERATE_FAILED_NOTICE: &str = "Failed to generate the composition.";

/// A server-tracked training/generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Opaque identifier issued by the service on submission.
    pub id: String,
    pub status: JobStatus,
    /// Human-readable progress text supplied by the service.
    pub message: String,
}

/// Where the session currently is in the upload -> train -> generate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Nothing selected, nothing running.
    Idle,
    /// Files are selected but not yet submitted.
    Selecting,
    /// The submission request is in flight.
    Submitting,
    /// A job is running and the poll loop is active.
    Polling,
    /// The job completed; generation may be requested.
    ReadyToGenerate,
    /// The generation request is in flight.
    Generating,
    /// The artifact has been retrieved.
    Finished,
    /// The session ended in failure (submission, polling, or generation).
    Failed,
}

/// Complete client-side session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// The current job, if one has been submitted.
    pub job: Option<Job>,
    /// Number of files in the current selection, for display.
    pub selected_files: usize,
    /// Fixed client-side failure message, when one applies.
    pub notice: Option<&'static str>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            job: None,
            selected_files: 0,
            notice: None,
        }
    }

    /// Whether the poll loop should be running for this state.
    pub fn polling(&self) -> bool {
        self.phase == SessionPhase::Polling
    }

    /// Generation is only reachable once the job has reported `complete`.
    pub fn can_generate(&self) -> bool {
        self.phase == SessionPhase::ReadyToGenerate
            && self
                .job
                .as_ref()
                .is_some_and(|job| job.status == JobStatus::Complete)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum Action {
    /// The user picked a new set of files.
    FilesSelected { count: usize },
    /// The submission request is about to be sent.
    SubmitStarted,
    /// The service accepted the submission.
    SubmitSucceeded { job_id: String, message: String },
    /// The submission request failed (transport or non-success status).
    SubmitFailed,
    /// A poll response arrived.
    StatusReported { status: JobStatus, message: String },
    /// Polling gave up after exhausting its retry policy.
    PollFailed,
    /// The generation request is about to be sent.
    GenerateStarted,
    /// The artifact was retrieved.
    GenerateSucceeded,
    /// The generation request failed.
    GenerateFailed,
}

/// Advance the session by one action.
///
/// Pure: the returned state is a function of the inputs alone.  Actions
/// that are not valid in the current phase return the state unchanged.
pub fn reduce(mut state: SessionState, action: Action) -> SessionState {
    match action {
        // A new selection always wins: it discards the previous job (and,
        // at the controller level, its poll loop and artifact).
        Action::FilesSelected { count } => SessionState {
            phase: if count > 0 {
                SessionPhase::Selecting
            } else {
                SessionPhase::Idle
            },
            job: None,
            selected_files: count,
            notice: None,
        },

        // Submitting an empty selection is a no-op.
        Action::SubmitStarted => {
            if state.selected_files == 0 || state.phase != SessionPhase::Selecting {
                return state;
            }
            state.phase = SessionPhase::Submitting;
            state.notice = None;
            state
        }

        Action::SubmitSucceeded { job_id, message } => {
            if state.phase != SessionPhase::Submitting {
                return state;
            }
            state.phase = SessionPhase::Polling;
            state.job = Some(Job {
                id: job_id,
                status: JobStatus::Starting,
                message,
            });
            state
        }

        Action::SubmitFailed => {
            if state.phase != SessionPhase::Submitting {
                return state;
            }
            state.phase = SessionPhase::Failed;
            state.notice = Some(SUBMIT_FAILED_NOTICE);
            state
        }

        Action::StatusReported { status, message } => {
            if state.phase != SessionPhase::Polling {
                return state;
            }
            if let Some(job) = state.job.as_mut() {
                job.status = status;
                job.message = message;
                state.phase = match status {
                    JobStatus::Complete => SessionPhase::ReadyToGenerate,
                    JobStatus::Failed => SessionPhase::Failed,
                    _ => SessionPhase::Polling,
                };
            }
            state
        }

        Action::PollFailed => {
            if state.phase != SessionPhase::Polling {
                return state;
            }
            state.phase = SessionPhase::Failed;
            state.notice = Some(POLL_FAILED_NOTICE);
            state
        }

        Action::GenerateStarted => {
            if !state.can_generate() {
                return state;
            }
            state.phase = SessionPhase::Generating;
            if let Some(job) = state.job.as_mut() {
                job.status = JobStatus::Generating;
            }
            state
        }

        Action::GenerateSucceeded => {
            if state.phase != SessionPhase::Generating {
                return state;
            }
            state.phase = SessionPhase::Finished;
            if let Some(job) = state.job.as_mut() {
                job.status = JobStatus::Finished;
            }
            state
        }

        Action::GenerateFailed => {
            if state.phase != SessionPhase::Generating {
                return state;
            }
            state.phase = SessionPhase::Failed;
            state.notice = Some(GENERATE_FAILED_NOTICE);
            state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> SessionState {
        let state = reduce(SessionState::new(), Action::FilesSelected { count: 3 });
        let state = reduce(state, Action::SubmitStarted);
        reduce(
            state,
            Action::SubmitSucceeded {
                job_id: "j1".into(),
                message: "queued".into(),
            },
        )
    }

    #[test]
    fn selecting_files_records_count_and_clears_job() {
        let state = reduce(SessionState::new(), Action::FilesSelected { count: 3 });
        assert_eq!(state.phase, SessionPhase::Selecting);
        assert_eq!(state.selected_files, 3);
        assert!(state.job.is_none());
    }

    #[test]
    fn selecting_replaces_a_previous_job() {
        let state = reduce(submitted(), Action::FilesSelected { count: 1 });
        assert_eq!(state.phase, SessionPhase::Selecting);
        assert!(state.job.is_none());
        assert_eq!(state.selected_files, 1);
    }

    #[test]
    fn submit_with_empty_selection_is_a_no_op() {
        let state = SessionState::new();
        let after = reduce(state.clone(), Action::SubmitStarted);
        assert_eq!(after, state);
    }

    #[test]
    fn successful_submission_starts_polling() {
        let state = submitted();
        assert_eq!(state.phase, SessionPhase::Polling);
        let job = state.job.unwrap();
        assert_eq!(job.id, "j1");
        assert_eq!(job.status, JobStatus::Starting);
        assert_eq!(job.message, "queued");
    }

    #[test]
    fn failed_submission_sets_fixed_notice() {
        let state = reduce(SessionState::new(), Action::FilesSelected { count: 2 });
        let state = reduce(state, Action::SubmitStarted);
        let state = reduce(state, Action::SubmitFailed);
        assert_eq!(state.phase, SessionPhase::Failed);
        assert_eq!(state.notice, Some(SUBMIT_FAILED_NOTICE));
    }

    #[test]
    fn in_flight_status_keeps_polling() {
        let state = reduce(
            submitted(),
            Action::StatusReported {
                status: JobStatus::Training,
                message: "epoch 2/10".into(),
            },
        );
        assert_eq!(state.phase, SessionPhase::Polling);
        let job = state.job.unwrap();
        assert_eq!(job.status, JobStatus::Training);
        assert_eq!(job.message, "epoch 2/10");
    }

    #[test]
    fn complete_status_enables_generation() {
        let state = reduce(
            submitted(),
            Action::StatusReported {
                status: JobStatus::Complete,
                message: "done".into(),
            },
        );
        assert_eq!(state.phase, SessionPhase::ReadyToGenerate);
        assert!(state.can_generate());
        assert!(!state.polling());
    }

    #[test]
    fn failed_status_ends_the_session() {
        let state = reduce(
            submitted(),
            Action::StatusReported {
                status: JobStatus::Failed,
                message: "OOM".into(),
            },
        );
        assert_eq!(state.phase, SessionPhase::Failed);
        assert!(!state.can_generate());
        assert!(!state.polling());
        assert_eq!(state.job.unwrap().message, "OOM");
    }

    #[test]
    fn generate_is_unreachable_before_complete() {
        let state = submitted();
        assert!(!state.can_generate());
        let after = reduce(state.clone(), Action::GenerateStarted);
        assert_eq!(after, state);
    }

    #[test]
    fn full_happy_path() {
        let state = reduce(
            submitted(),
            Action::StatusReported {
                status: JobStatus::Complete,
                message: "done".into(),
            },
        );
        let state = reduce(state, Action::GenerateStarted);
        assert_eq!(state.phase, SessionPhase::Generating);
        assert_eq!(state.job.as_ref().unwrap().status, JobStatus::Generating);

        let state = reduce(state, Action::GenerateSucceeded);
        assert_eq!(state.phase, SessionPhase::Finished);
        assert_eq!(state.job.unwrap().status, JobStatus::Finished);
    }

    #[test]
    fn generation_failure_sets_fixed_notice() {
        let state = reduce(
            submitted(),
            Action::StatusReported {
                status: JobStatus::Complete,
                message: "done".into(),
            },
        );
        let state = reduce(state, Action::GenerateStarted);
        let state = reduce(state, Action::GenerateFailed);
        assert_eq!(state.phase, SessionPhase::Failed);
        assert_eq!(state.notice, Some(GENERATE_FAILED_NOTICE));
    }

    #[test]
    fn poll_failure_sets_fixed_notice() {
        let state = reduce(submitted(), Action::PollFailed);
        assert_eq!(state.phase, SessionPhase::Failed);
        assert_eq!(state.notice, Some(POLL_FAILED_NOTICE));
    }

    #[test]
    fn late_status_after_replacement_is_ignored() {
        // A poll response that races a new file selection must not
        // resurrect the discarded job.
        let state = reduce(submitted(), Action::FilesSelected { count: 1 });
        let after = reduce(
            state.clone(),
            Action::StatusReported {
                status: JobStatus::Complete,
                message: "done".into(),
            },
        );
        assert_eq!(after, state);
    }
}
