//! Job submission and the poll loop that waits for a terminal status.
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::replicate::job::{Job, JobStatus, SubmissionRequest};
use crate::replicate::PredictionService;

/// Fixed-interval poll budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        PollPolicy {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    /// Two seconds between fetches, two minutes in total.
    fn default() -> Self {
        PollPolicy::new(Duration::from_millis(2000), 60)
    }
}

#[derive(Clone)]
pub struct JobClient {
    service: Arc<dyn PredictionService>,
    policy: PollPolicy,
}

impl JobClient {
    pub fn new(service: Arc<dyn PredictionService>, policy: PollPolicy) -> Self {
        JobClient { service, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn service(&self) -> &dyn PredictionService {
        self.service.as_ref()
    }

    /// Submit a job for `resource_url`. Rejections carry the raw response body.
    pub async fn submit(&self, resource_url: &str, parameters: Map<String, Value>) -> AppResult<Job> {
        let request = SubmissionRequest::new(resource_url, parameters);
        self.service.create(&request).await
    }

    /// Poll `job` by id until it is terminal or the attempt budget runs out.
    ///
    /// Sleeps `policy.interval` before each fetch. Returns the last observed
    /// job, which is non-terminal when the budget ran out or a fetch failed.
    pub async fn await_terminal(&self, job: Job, policy: PollPolicy) -> Job {
        let mut job = job;
        let mut attempts = 0;

        while !job.is_terminal() && attempts < policy.max_attempts {
            attempts += 1;
            tracing::info!(
                "Polling attempt {}, id: {}, status: {}",
                attempts,
                job.id,
                job.status
            );
            tokio::time::sleep(policy.interval).await;

            match self.service.get(&job.id).await {
                Ok(next) => {
                    tracing::debug!(id = %next.id, status = %next.status, logs = ?next.logs, "Poll result");
                    job = next;
                }
                Err(e) => {
                    tracing::error!("Failed to poll prediction status: {}", e);
                    break;
                }
            }
        }

        if job.is_terminal() {
            tracing::info!("Final prediction status: {}", job.status);
        } else {
            tracing::warn!(
                "Prediction {} still {} after {} polls",
                job.id,
                job.status,
                attempts
            );
        }
        job
    }

    /// Submit, wait with the configured policy, and resolve the outcome.
    pub async fn run(&self, resource_url: &str, parameters: Map<String, Value>) -> AppResult<Job> {
        let job = self.submit(resource_url, parameters).await?;
        resolve(self.await_terminal(job, self.policy).await)
    }
}

/// Split a final job into success, terminal failure, or timeout.
pub fn resolve(job: Job) -> AppResult<Job> {
    match job.status {
        JobStatus::Succeeded => Ok(job),
        JobStatus::Failed | JobStatus::Canceled => Err(AppError::JobFailed(Box::new(job))),
        _ => Err(AppError::Timeout(Box::new(job))),
    }
}
