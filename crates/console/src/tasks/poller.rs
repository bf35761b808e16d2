use std::sync::Arc;

use protocol::{CreateTaskRequest, TaskResult, TaskState, TaskStatusReport};
use tracing::{debug, info, warn};

use super::api::TaskApi;
use super::backoff::{Backoff, BackoffPolicy, JitterSource, RandomJitter, Sleeper, TokioSleeper};
use crate::error::{ClientError, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
const GENERIC_TASK_FAILURE: &str = "task failed";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOptions {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Called after every non-terminal status check with the attempt number
/// (starting at 1) and the report.
pub type ProgressFn<'a> = &'a (dyn Fn(u32, &TaskStatusReport) + Send + Sync);

pub struct TaskPoller {
    api: Arc<dyn TaskApi>,
    options: PollOptions,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn TaskApi>, options: PollOptions) -> Self {
        Self {
            api,
            options,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        }
    }

    pub fn with_clock(mut self, sleeper: Arc<dyn Sleeper>, jitter: Arc<dyn JitterSource>) -> Self {
        self.sleeper = sleeper;
        self.jitter = jitter;
        self
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Submits the task and waits for its result.
    pub async fn run(
        &self,
        request: &CreateTaskRequest,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TaskResult> {
        let created = self.api.create_task(request).await?;
        self.poll_until_complete(&created.task_id, on_progress).await
    }

    /// Polls until the task is terminal or `max_attempts` status checks
    /// have been made.
    ///
    /// A failed status check counts as an attempt and is retried after the
    /// usual delay. An `ERROR` status, a failed result fetch, or an
    /// unparsable result ends the poll at once.
    pub async fn poll_until_complete(
        &self,
        task_id: &str,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TaskResult> {
        let max_attempts = self.options.max_attempts;
        let mut backoff = Backoff::new(self.options.backoff);
        for attempt in 1..=max_attempts {
            match self.api.task_status(task_id).await {
                Ok(report) => match report.status {
                    TaskState::Completed => {
                        info!(task_id, attempt, "task completed");
                        let document = self.api.task_document(task_id).await?;
                        return document
                            .parse_result()
                            .map_err(|err| ClientError::decode("task result", err));
                    }
                    TaskState::Error => {
                        let message = report
                            .error
                            .filter(|message| !message.trim().is_empty())
                            .unwrap_or_else(|| GENERIC_TASK_FAILURE.to_string());
                        warn!(task_id, attempt, error = %message, "task failed");
                        return Err(ClientError::TaskFailed {
                            task_id: task_id.to_string(),
                            message,
                        });
                    }
                    TaskState::InProgress => {
                        debug!(task_id, attempt, "task in progress");
                        if let Some(on_progress) = on_progress {
                            on_progress(attempt, &report);
                        }
                    }
                },
                Err(err) => {
                    warn!(task_id, attempt, error = %err, "task status check failed");
                }
            }
            if attempt < max_attempts {
                let delay = backoff.next_delay(self.jitter.as_ref());
                debug!(task_id, attempt, delay_ms = delay.as_millis() as u64, "waiting before next status check");
                self.sleeper.sleep(delay).await;
            }
        }
        warn!(task_id, attempts = max_attempts, "task polling timed out");
        Err(ClientError::PollTimeout {
            task_id: task_id.to_string(),
            attempts: max_attempts,
        })
    }
}
