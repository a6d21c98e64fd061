//! Fixed-interval status poll loop.
//!
//! [`spawn_poller`] starts one cancellable task per job.  The task wakes on
//! a fixed interval, looks up the job status (retrying per the configured
//! [`RetryConfig`]), folds the result into the shared session state through
//! the pure reducer, and broadcasts a [`SessionEvent`].  The loop ends when
//! a terminal status is observed, the retry policy is exhausted, or the
//! [`PollHandle`] is cancelled or dropped.
//!
//! Polls are strictly sequential: the next interval tick is not awaited
//! until the previous poll (including its retries) has been handled, so two
//! status requests for the same job are never in flight at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use cadenza_core::session::{reduce, Action, SessionState};

use crate::api::{ComposerApi, ComposerApiError, StatusResponse};
use crate::events::SessionEvent;
use crate::retry::{next_delay, RetryConfig};

/// Default wall-clock interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Tunable parameters for the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wall-clock interval between polls.
    pub interval: Duration,
    /// Retry policy applied to each poll.
    pub retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            retry: RetryConfig::default(),
        }
    }
}

/// Handle to a running poll task.
///
/// Dropping the handle cancels the task, so a session that goes away can
/// never leave an orphaned poll loop writing into discarded state.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl PollHandle {
    /// Stop the poll loop.  Any in-flight request is abandoned.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the poll task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn the poll loop for a job.
///
/// The caller is responsible for holding on to the returned handle for as
/// long as the job is current; replacing or dropping it cancels the loop,
/// which keeps exactly one loop alive per job.
pub fn spawn_poller(
    api: Arc<ComposerApi>,
    job_id: String,
    config: PollConfig,
    state: Arc<RwLock<SessionState>>,
    event_tx: broadcast::Sender<SessionEvent>,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let task = tokio::spawn(async move {
        tracing::debug!(job_id = %job_id, interval_ms = config.interval.as_millis() as u64, "Poll loop started");
        run_poll_loop(&api, &job_id, &config, &state, &event_tx, &task_cancel).await;
        tracing::debug!(job_id = %job_id, "Poll loop exited");
    });

    PollHandle { cancel, task }
}

/// Core poll loop: tick -> poll (with retry) -> reduce -> broadcast.
async fn run_poll_loop(
    api: &ComposerApi,
    job_id: &str,
    config: &PollConfig,
    state: &RwLock<SessionState>,
    event_tx: &broadcast::Sender<SessionEvent>,
    cancel: &CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately; consume it so
    // the first poll lands one interval after submission.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match poll_with_retry(api, job_id, &config.retry, cancel).await {
            Some(Ok(report)) => {
                let status = report.status;
                {
                    let mut guard = state.write().await;
                    *guard = reduce(
                        guard.clone(),
                        Action::StatusReported {
                            status,
                            message: report.message.clone(),
                        },
                    );
                }
                let _ = event_tx.send(SessionEvent::StatusChanged {
                    job_id: job_id.to_string(),
                    status,
                    message: report.message,
                });
                if status.is_terminal() {
                    tracing::info!(job_id = %job_id, status = %status, "Job reached terminal status");
                    return;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(job_id = %job_id, error = %e, "Giving up on status polling");
                {
                    let mut guard = state.write().await;
                    *guard = reduce(guard.clone(), Action::PollFailed);
                }
                let _ = event_tx.send(SessionEvent::PollGaveUp {
                    job_id: job_id.to_string(),
                    error: e.to_string(),
                });
                return;
            }
            None => return, // cancelled mid-poll
        }
    }
}

/// Issue one status lookup, retrying with exponential backoff.
///
/// Returns `Some(Ok(_))` on the first successful response, `Some(Err(_))`
/// with the last error once [`RetryConfig::max_attempts`] is exhausted, or
/// `None` if the `cancel` token fires first.
async fn poll_with_retry(
    api: &ComposerApi,
    job_id: &str,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> Option<Result<StatusResponse, ComposerApiError>> {
    let mut delay = retry.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        tokio::select! {
            _ = cancel.cancelled() => return None,
            result = api.job_status(job_id) => {
                match result {
                    Ok(report) => return Some(Ok(report)),
                    Err(e) => {
                        tracing::warn!(
                            job_id = %job_id,
                            attempt,
                            error = %e,
                            "Status poll attempt failed",
                        );
                        if attempt >= retry.max_attempts.max(1) {
                            return Some(Err(e));
                        }
                    }
                }
            }
        }

        // Wait before the next attempt, respecting cancellation.
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, retry);
    }
}
