//! Axum request handlers for the HTTP API.
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::config::Backend;
use crate::error::{AppError, AppResult, GenerateError};
use crate::pipeline;
use crate::utils::TempUpload;

/// Fields of a `/generate-texture` form.
struct UploadForm {
    image: Option<TempUpload>,
    prompt: Option<String>,
}

impl UploadForm {
    /// Read the form. The image goes straight to a temp file under `upload_dir`;
    /// unknown fields are ignored.
    async fn read(mut multipart: Multipart, upload_dir: &Path, limit: usize) -> AppResult<Self> {
        let rejected = |e: MultipartError| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge { limit }
            } else {
                AppError::Multipart(e.body_text())
            }
        };
        let mut form = UploadForm {
            image: None,
            prompt: None,
        };
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(rejected)?
        {
            match field.name() {
                Some("image") => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(rejected)?;
                    if bytes.is_empty() {
                        continue;
                    }
                    tracing::info!(
                        originalname = ?file_name,
                        mimetype = ?content_type,
                        size = bytes.len(),
                        "File received"
                    );
                    form.image =
                        Some(TempUpload::persist(upload_dir, &bytes, file_name.as_deref()).await?);
                }
                Some("prompt") => {
                    let text = field
                        .text()
                        .await
                        .map_err(rejected)?;
                    let text = text.trim();
                    if !text.is_empty() {
                        form.prompt = Some(text.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

pub async fn generate_texture(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, GenerateError> {
    tracing::info!("=== Starting texture generation ({}) ===", state.backend.as_str());
    let form = UploadForm::read(multipart, &state.upload_dir, state.max_upload_bytes).await?;
    let prompt = form
        .prompt
        .unwrap_or_else(|| state.default_prompt.clone());

    match state.backend {
        Backend::Replicate => {
            let upload = form.image.ok_or(AppError::MissingImage)?;
            let jobs = state.jobs.as_ref().ok_or_else(|| {
                AppError::Configuration("Replicate API token not configured".to_string())
            })?;
            let host = state.blob_host.as_deref().ok_or_else(|| {
                AppError::Configuration("Cloudinary credentials not configured".to_string())
            })?;
            let generated =
                pipeline::generate_hosted(host, jobs, upload, &prompt, &state.cloudinary_folder)
                    .await?;
            Ok(Json(generated).into_response())
        }
        Backend::Local => {
            let generated = pipeline::generate_local(
                &state.predictor,
                state.blob_host.as_deref(),
                form.image,
                &prompt,
            )
            .await?;
            Ok(Json(generated).into_response())
        }
    }
}

pub async fn test_cloudinary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let failed = |error: String| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": error,
                "cloudinary_status": "failed",
            })),
        )
    };
    let Some(host) = state.blob_host.as_ref() else {
        return failed("Cloudinary credentials not configured".to_string());
    };
    match host.ping().await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "cloudinary_status": "connected",
                "result": result,
            })),
        ),
        Err(e) => failed(e.to_string()),
    }
}

pub async fn test_replicate(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(jobs) = state.jobs.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Replicate API token not configured",
                "replicate_status": "failed",
            })),
        );
    };
    match jobs.service().ping().await {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "replicate_status": "connected",
                "status": status,
            })),
        ),
        Err(e) => {
            let mut body = json!({
                "success": false,
                "replicate_status": "failed",
            });
            match e {
                AppError::Upstream { status, body: text, .. } => {
                    body["error"] = Value::String(text);
                    body["status"] = Value::from(status);
                }
                other => body["error"] = Value::String(other.to_string()),
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "Texture relay running",
        "backend": state.backend.as_str(),
    }))
}
