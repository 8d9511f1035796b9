//! Prediction service integration.
//!
//! - `job`: the `Job` snapshot and the `SubmissionRequest` that creates one.
//! - `client`: reqwest client for the Replicate predictions API.
//! - `poll`: `JobClient`, which submits a job and polls it to a terminal state.
pub mod client;
pub mod job;
pub mod poll;

use async_trait::async_trait;

use crate::error::AppResult;
use job::{Job, SubmissionRequest};

/// Asynchronous prediction backend: create a job, then look it up by id.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn create(&self, request: &SubmissionRequest) -> AppResult<Job>;

    async fn get(&self, id: &str) -> AppResult<Job>;

    /// Connectivity probe. Returns the HTTP status on success.
    async fn ping(&self) -> AppResult<u16>;
}
