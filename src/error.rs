//! Common error type and result alias.
//!
//! `AppError` covers every failure the relay can report. `GenerateError`
//! wraps it for the generate endpoint so a hosted image URL, once known,
//! travels with the error into the JSON body.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::replicate::job::Job;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid settings; fatal to the request.
    #[error("{0}")]
    Configuration(String),

    /// The blob hosting call failed.
    #[error("Upload failed: {message}")]
    Upload { status: Option<u16>, message: String },

    /// The prediction service rejected job creation.
    #[error("Failed to start prediction. Status: {status}, Body: {body}")]
    Submission { status: u16, body: String },

    /// A status fetch failed mid-loop. The poll loop swallows this one.
    #[error("Failed to poll prediction {id}: {message}")]
    PollTransport { id: String, message: String },

    #[error("Prediction {} failed", .0.id)]
    JobFailed(Box<Job>),

    #[error("Prediction {} did not finish, last status: {}", .0.id, .0.status)]
    Timeout(Box<Job>),

    /// A probe or lookup answered with a non-success status.
    #[error("{service} responded with status {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("No image file provided")]
    MissingImage,

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    /// The request body went over `MAX_UPLOAD_BYTES`.
    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    LocalPredictor(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingImage | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short human-readable summary used as the `error` field.
    pub fn headline(&self) -> String {
        match self {
            AppError::Configuration(msg) => msg.clone(),
            AppError::Upload { .. } => "Failed to upload image".to_string(),
            AppError::Submission { .. } => "Failed to start prediction".to_string(),
            AppError::PollTransport { .. } => "Failed to poll prediction".to_string(),
            AppError::JobFailed(_) => "Prediction failed".to_string(),
            AppError::Timeout(_) => "Prediction timed out".to_string(),
            AppError::Upstream { service, .. } => format!("{} request failed", service),
            AppError::MissingImage => "No image file provided".to_string(),
            AppError::Multipart(_) => "Invalid upload".to_string(),
            AppError::PayloadTooLarge { .. } => "Image too large".to_string(),
            AppError::LocalPredictor(_) => "Local prediction failed".to_string(),
            AppError::HttpClient(_) | AppError::Io(_) | AppError::Json(_) => {
                "Something went wrong".to_string()
            }
        }
    }

    /// Diagnostic payload for the `details` field.
    ///
    /// Remote bodies are parsed as JSON when possible and passed through
    /// verbatim as a string otherwise.
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::MissingImage => None,
            AppError::Submission { body, .. } | AppError::Upstream { body, .. } => {
                Some(raw_body_details(body))
            }
            AppError::Upload { message, .. } => Some(raw_body_details(message)),
            AppError::JobFailed(job) | AppError::Timeout(job) => {
                Some(serde_json::to_value(job.as_ref()).unwrap_or(Value::Null))
            }
            AppError::Configuration(_) => {
                Some(Value::String("Check the relay's environment configuration".to_string()))
            }
            AppError::PollTransport { message, .. } => Some(Value::String(message.clone())),
            AppError::PayloadTooLarge { .. } => Some(Value::String(self.to_string())),
            AppError::Multipart(msg) | AppError::LocalPredictor(msg) => {
                Some(Value::String(msg.clone()))
            }
            AppError::HttpClient(e) => Some(Value::String(e.to_string())),
            AppError::Io(e) => Some(Value::String(e.to_string())),
            AppError::Json(e) => Some(Value::String(e.to_string())),
        }
    }

    /// HTTP status reported by the remote side, when there was one.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            AppError::Submission { status, .. } | AppError::Upstream { status, .. } => {
                Some(*status)
            }
            AppError::Upload { status, .. } => *status,
            _ => None,
        }
    }

    pub fn to_body(&self) -> Value {
        let mut body = json!({ "error": self.headline() });
        if let Some(details) = self.details() {
            body["details"] = details;
        }
        if let Some(status) = self.remote_status() {
            body["status"] = Value::from(status);
        }
        body
    }
}

fn raw_body_details(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        GenerateError::from(self).into_response()
    }
}

/// Failure of a generate request, optionally tagged with the hosted URL.
#[derive(Debug)]
pub struct GenerateError {
    pub source: AppError,
    pub cloudinary_url: Option<String>,
}

impl GenerateError {
    pub fn with_url(source: AppError, url: &str) -> Self {
        GenerateError {
            source,
            cloudinary_url: Some(url.to_string()),
        }
    }
}

impl From<AppError> for GenerateError {
    fn from(source: AppError) -> Self {
        GenerateError {
            source,
            cloudinary_url: None,
        }
    }
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = self.source.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.source);
        } else {
            tracing::warn!("Rejected request: {}", self.source);
        }
        let mut body = self.source.to_body();
        if let Some(url) = self.cloudinary_url {
            body["cloudinary_url"] = Value::String(url);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replicate::job::JobStatus;

    #[test]
    fn submission_details_keep_raw_text_body() {
        let err = AppError::Submission {
            status: 422,
            body: "version is invalid".to_string(),
        };
        let body = err.to_body();
        assert_eq!(body["error"], "Failed to start prediction");
        assert_eq!(body["details"], "version is invalid");
        assert_eq!(body["status"], 422);
    }

    #[test]
    fn submission_details_parse_json_body() {
        let err = AppError::Submission {
            status: 422,
            body: r#"{"detail":"Invalid version or not permitted"}"#.to_string(),
        };
        assert_eq!(
            err.to_body()["details"]["detail"],
            "Invalid version or not permitted"
        );
    }

    #[test]
    fn missing_image_is_a_bad_request_without_details() {
        let err = AppError::MissingImage;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_body(), json!({ "error": "No image file provided" }));
    }

    #[test]
    fn oversized_upload_names_the_limit() {
        let err = AppError::PayloadTooLarge { limit: 1024 };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            err.to_body(),
            json!({ "error": "Image too large", "details": "Upload exceeds the 1024 byte limit" })
        );
    }

    #[test]
    fn job_failure_carries_the_job() {
        let job = Job::new("abc", JobStatus::Failed).with_error(json!("CUDA out of memory"));
        let err = AppError::JobFailed(Box::new(job));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_body();
        assert_eq!(body["error"], "Prediction failed");
        assert_eq!(body["details"]["id"], "abc");
        assert_eq!(body["details"]["error"], "CUDA out of memory");
    }
}
