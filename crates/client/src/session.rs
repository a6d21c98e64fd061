//! Session controller for the upload -> train -> generate flow.
//!
//! [`JobSession`] owns the API client, the shared session state, and the
//! poll loop handle for the current job.  Every remote-call failure is
//! absorbed into the session state (and the event stream) rather than
//! propagated to the caller; the caller observes outcomes through
//! [`JobSession::snapshot`] and [`JobSession::subscribe`].

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use cadenza_core::artifact::Artifact;
use cadenza_core::session::{reduce, Action, SessionPhase, SessionState};

use crate::api::{ComposerApi, UploadFile};
use crate::events::SessionEvent;
use crate::poller::{spawn_poller, PollConfig, PollHandle};

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Filename extensions the file picker is expected to allow.
///
/// The check is advisory: a non-MIDI extension is logged, never rejected.
/// The service is the authority on whether an upload is usable.
const MIDI_EXTENSIONS: &[&str] = &["mid", "midi"];

/// Whether a filename carries one of the advisory MIDI extensions.
pub fn is_midi_filename(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| MIDI_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Drives one upload/train/generate session against a composer service.
pub struct JobSession {
    api: Arc<ComposerApi>,
    config: PollConfig,
    state: Arc<RwLock<SessionState>>,
    files: Vec<UploadFile>,
    artifact: Option<Artifact>,
    /// Poll loop for the current job.  Replacing or dropping the handle
    /// cancels the loop, so at most one loop is ever alive per session.
    poller: Option<PollHandle>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl JobSession {
    pub fn new(api: ComposerApi, config: PollConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api: Arc::new(api),
            config,
            state: Arc::new(RwLock::new(SessionState::new())),
            files: Vec::new(),
            artifact: None,
            poller: None,
            event_tx,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// A copy of the current session state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The artifact retrieved by the last successful [`generate`](Self::generate).
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Replace the file selection.
    ///
    /// Discards the previous job, its poll loop, and any retrieved
    /// artifact.  Non-MIDI extensions are logged but accepted.
    pub async fn select_files(&mut self, files: Vec<UploadFile>) -> SessionState {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
        self.artifact = None;

        for file in &files {
            if !is_midi_filename(&file.name) {
                tracing::warn!(name = %file.name, "Selected file does not look like MIDI");
            }
        }

        let count = files.len();
        self.files = files;
        self.apply(Action::FilesSelected { count }).await
    }

    /// Submit the current selection and start polling.
    ///
    /// A no-op when nothing is selected (or a job is already running): no
    /// network call is made and the state is returned unchanged.  A failed
    /// submission leaves the session in its failed phase with the fixed
    /// notice; the underlying error goes to the log and the event stream.
    pub async fn submit(&mut self) -> SessionState {
        let state = self.apply(Action::SubmitStarted).await;
        if state.phase != SessionPhase::Submitting {
            return state;
        }

        match self.api.upload_and_train(self.files.clone()).await {
            Ok(response) => {
                tracing::info!(
                    job_id = %response.job_id,
                    files = self.files.len(),
                    "Training job submitted",
                );
                let state = self
                    .apply(Action::SubmitSucceeded {
                        job_id: response.job_id.clone(),
                        message: response.message.clone(),
                    })
                    .await;
                let _ = self.event_tx.send(SessionEvent::JobSubmitted {
                    job_id: response.job_id.clone(),
                    message: response.message,
                });
                self.poller = Some(spawn_poller(
                    Arc::clone(&self.api),
                    response.job_id,
                    self.config.clone(),
                    Arc::clone(&self.state),
                    self.event_tx.clone(),
                ));
                state
            }
            Err(e) => {
                tracing::error!(error = %e, "Submission failed");
                let state = self.apply(Action::SubmitFailed).await;
                let _ = self.event_tx.send(SessionEvent::SubmitFailed {
                    error: e.to_string(),
                });
                state
            }
        }
    }

    /// Send a stop signal for the current job.
    ///
    /// Fire-and-forget: the outcome does not alter local state, and polling
    /// continues — the next poll result is the sole source of truth for
    /// whether the cancellation took effect.  No-op without a job.
    pub async fn stop(&self) {
        let job_id = {
            let guard = self.state.read().await;
            guard.job.as_ref().map(|job| job.id.clone())
        };
        let Some(job_id) = job_id else {
            return;
        };

        let _ = self.event_tx.send(SessionEvent::StopRequested {
            job_id: job_id.clone(),
        });
        if let Err(e) = self.api.stop_job(&job_id).await {
            tracing::warn!(job_id = %job_id, error = %e, "Stop request failed");
        }
    }

    /// Retrieve the generated composition for the completed job.
    ///
    /// Only reachable once the job has reported `complete`; calling it in
    /// any other phase is a no-op returning `None`.  On failure the session
    /// moves to its failed phase and `None` is returned.
    pub async fn generate(&mut self) -> Option<Artifact> {
        let state = self.apply(Action::GenerateStarted).await;
        if state.phase != SessionPhase::Generating {
            return None;
        }
        let job_id = state.job.as_ref().map(|job| job.id.clone())?;

        match self.api.generate(&job_id).await {
            Ok(artifact) => {
                tracing::info!(
                    job_id = %job_id,
                    size = artifact.bytes.len(),
                    "Composition generated",
                );
                self.apply(Action::GenerateSucceeded).await;
                let _ = self.event_tx.send(SessionEvent::ArtifactReady {
                    job_id,
                    size: artifact.bytes.len(),
                });
                self.artifact = Some(artifact.clone());
                Some(artifact)
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Generation failed");
                self.apply(Action::GenerateFailed).await;
                let _ = self.event_tx.send(SessionEvent::GenerateFailed {
                    job_id,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    // ---- private helpers ----

    /// Advance the shared state through the reducer and return the result.
    async fn apply(&self, action: Action) -> SessionState {
        let mut guard = self.state.write().await;
        let next = reduce(guard.clone(), action);
        *guard = next.clone();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_extensions_accepted_case_insensitively() {
        assert!(is_midi_filename("sonata.mid"));
        assert!(is_midi_filename("sonata.MIDI"));
        assert!(is_midi_filename("dir.with.dots.Mid"));
    }

    #[test]
    fn other_extensions_flagged() {
        assert!(!is_midi_filename("sonata.wav"));
        assert!(!is_midi_filename("sonata"));
        assert!(!is_midi_filename("mid"));
    }
}
