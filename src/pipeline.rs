//! Per-request generation flows.
//!
//! Hosted: upload the image, submit a prediction against its URL, poll it to
//! a terminal state. Local: run the predictor script, then optionally host
//! the generated file. Uploaded temp files are gone by the time either
//! function returns.
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cloudinary::{BlobHost, ResourceType, UploadOptions};
use crate::error::{AppError, GenerateError};
use crate::local::predictor::LocalPredictor;
use crate::replicate::poll::{resolve, JobClient};
use crate::utils::TempUpload;

pub const GENERATED_FOLDER: &str = "generated-textures";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostedGeneration {
    pub output: Value,
    pub cloudinary_url: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalGeneration {
    pub success: bool,
    pub output: Option<String>,
    pub hosted_url: Option<String>,
    pub prompt: String,
}

pub async fn generate_hosted(
    host: &dyn BlobHost,
    jobs: &JobClient,
    upload: TempUpload,
    prompt: &str,
    folder: &str,
) -> Result<HostedGeneration, GenerateError> {
    tracing::info!("Uploading to Cloudinary...");
    let uploaded = host
        .upload(upload.path(), &UploadOptions::new(folder, ResourceType::Auto))
        .await;
    upload.release().await;
    let hosted_url = uploaded?.secure_url;

    let with_url = |e: AppError| GenerateError::with_url(e, &hosted_url);

    let mut parameters = Map::new();
    parameters.insert("prompt".to_string(), Value::String(prompt.to_string()));
    let job = jobs.submit(&hosted_url, parameters).await.map_err(with_url)?;
    tracing::info!("Initial prediction: {} ({})", job.id, job.status);

    let job = jobs.await_terminal(job, jobs.policy()).await;
    let job = resolve(job).map_err(with_url)?;
    tracing::info!("Prediction succeeded, output: {:?}", job.output);

    Ok(HostedGeneration {
        output: job.output.unwrap_or(Value::Null),
        cloudinary_url: hosted_url,
        id: job.id,
    })
}

pub async fn generate_local(
    predictor: &LocalPredictor,
    host: Option<&dyn BlobHost>,
    upload: Option<TempUpload>,
    prompt: &str,
) -> Result<LocalGeneration, GenerateError> {
    tracing::info!("Running local prediction with prompt: {}", prompt);
    let result = predictor
        .run(prompt, upload.as_ref().map(|u| u.path()))
        .await;
    if let Some(upload) = upload {
        upload.release().await;
    }

    let prediction = result?;
    if !prediction.success {
        let reason = prediction
            .error
            .unwrap_or_else(|| "predictor reported failure".to_string());
        return Err(AppError::LocalPredictor(reason).into());
    }

    let mut hosted_url = None;
    if let (Some(host), Some(output)) = (host, prediction.output_path.as_deref()) {
        let options = UploadOptions::new(GENERATED_FOLDER, ResourceType::Image);
        match host.upload(std::path::Path::new(output), &options).await {
            Ok(asset) => {
                tracing::info!("Result uploaded to Cloudinary: {}", asset.secure_url);
                hosted_url = Some(asset.secure_url);
            }
            Err(e) => tracing::warn!("Cloudinary upload failed (optional): {}", e),
        }
    }

    Ok(LocalGeneration {
        success: true,
        output: prediction.output_path,
        hosted_url,
        prompt: prompt.to_string(),
    })
}
