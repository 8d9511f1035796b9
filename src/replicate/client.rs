//! Thin HTTP client for the Replicate predictions API.
//!
//! - `create` posts `{version, input}` to `/v1/predictions`.
//! - `get` fetches `/v1/predictions/{id}`.
//! - `ping` lists `/v1/predictions` to check the token and connectivity.
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::json;

use crate::config::ReplicateSettings;
use crate::error::{AppError, AppResult};
use crate::replicate::job::{Job, SubmissionRequest};
use crate::replicate::PredictionService;

#[derive(Clone)]
pub struct ReplicateClient {
    client: Client,
    base_url: String,
    api_token: String,
    model_version: String,
}

impl ReplicateClient {
    pub fn new(settings: ReplicateSettings) -> AppResult<Self> {
        if settings.api_token.trim().is_empty() {
            return Err(AppError::Configuration(
                "Replicate API token not configured".to_string(),
            ));
        }
        if settings.model_version.trim().is_empty() {
            return Err(AppError::Configuration(
                "Replicate model version not configured".to_string(),
            ));
        }
        Ok(ReplicateClient {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token,
            model_version: settings.model_version,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.api_token)
    }
}

#[async_trait]
impl PredictionService for ReplicateClient {
    /// Create a prediction for the hosted resource.
    ///
    /// Non-success responses become `AppError::Submission` with the raw body.
    async fn create(&self, request: &SubmissionRequest) -> AppResult<Job> {
        let url = format!("{}/v1/predictions", self.base_url);
        let body = json!({
            "version": self.model_version,
            "input": request.to_input(),
        });
        tracing::info!(
            image = %request.resource_url(),
            version = %self.model_version,
            "Creating prediction at {}",
            url
        );
        tracing::debug!("Prediction input: {}", body["input"]);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::info!("Replicate API response status: {}", status);
        if status.is_success() {
            let job: Job = response.json().await?;
            tracing::info!(id = %job.id, status = %job.status, "Prediction created");
            Ok(job)
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            tracing::error!("Replicate rejected prediction. Status: {}, Body: {}", status, body);
            Err(AppError::Submission {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Fetch the current state of a prediction.
    async fn get(&self, id: &str) -> AppResult<Job> {
        let url = format!("{}/v1/predictions/{}", self.base_url, id);
        let transport = |message: String| AppError::PollTransport {
            id: id.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport(format!("status {}", status)));
        }
        response
            .json::<Job>()
            .await
            .map_err(|e| transport(e.to_string()))
    }

    async fn ping(&self) -> AppResult<u16> {
        let url = format!("{}/v1/predictions", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Upstream {
                service: "Replicate",
                status: status.as_u16(),
                body,
            })
        }
    }
}
