//! Wait for a task to finish and deliver its log.
//!
//! The worker API has no push notifications, so a background task polls the
//! task's status until it is terminal and then fetches the log. The result is
//! delivered exactly once through a oneshot channel; if polling gives up the
//! sender is dropped and the receiver observes a closed channel.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::api::WorkerApi;
use crate::error::ApiError;

/// Polling behavior of [`spawn_log_wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Consecutive failed requests tolerated before giving up.
    pub max_consecutive_errors: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_consecutive_errors: 5,
        }
    }
}

/// Start waiting for `task_id` in the background.
///
/// The returned receiver yields the task's log once the task reaches a
/// terminal status. It is closed without a value if the service keeps
/// failing or rejects the task id.
pub fn spawn_log_wait<A>(api: A, task_id: String, options: WaitOptions) -> oneshot::Receiver<Vec<u8>>
where
    A: WorkerApi + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_log(&api, &task_id, options).await {
            Ok(log) => {
                if tx.send(log).is_err() {
                    debug!(task_id = %task_id, "log receiver dropped");
                }
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "giving up waiting for task");
            }
        }
    });
    rx
}

async fn wait_for_log<A: WorkerApi>(
    api: &A,
    task_id: &str,
    options: WaitOptions,
) -> Result<Vec<u8>, ApiError> {
    let mut failures = 0;

    loop {
        match api.task_info(task_id).await {
            Ok(info) if info.status.is_terminal() => {
                debug!(task_id, status = %info.status, "task finished");
                break;
            }
            Ok(info) => {
                failures = 0;
                debug!(task_id, status = %info.status, "task not finished yet");
            }
            Err(e) => retry_or_fail(e, false, &mut failures, options)?,
        }
        tokio::time::sleep(options.poll_interval).await;
    }

    // The log can lag behind the final status for a moment.
    failures = 0;
    loop {
        match api.task_log(task_id).await {
            Ok(log) => return Ok(log),
            Err(e) => retry_or_fail(e, true, &mut failures, options)?,
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}

fn retry_or_fail(
    err: ApiError,
    missing_is_pending: bool,
    failures: &mut u32,
    options: WaitOptions,
) -> Result<(), ApiError> {
    *failures += 1;
    let retryable = err.is_transient() || (missing_is_pending && err.status_code() == Some(404));
    if !retryable || *failures >= options.max_consecutive_errors {
        return Err(err);
    }
    debug!(error = %err, attempt = *failures, "retrying");
    Ok(())
}
