//! Thin HTTP client for the Cloudinary upload API.
//!
//! - `upload` sends a signed multipart request to
//!   `/v1_1/<cloud>/<resource_type>/upload`.
//! - `ping` calls `/v1_1/<cloud>/ping` with basic auth.
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cloudinary::{BlobHost, HostedAsset, UploadOptions};
use crate::config::CloudinarySettings;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn new(settings: CloudinarySettings) -> AppResult<Self> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&settings.cloud_name) || blank(&settings.api_key) || blank(&settings.api_secret) {
            return Err(AppError::Configuration(
                "Cloudinary credentials not configured".to_string(),
            ));
        }
        Ok(CloudinaryClient {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            cloud_name: settings.cloud_name,
            api_key: settings.api_key,
            api_secret: settings.api_secret,
        })
    }

    fn upload_failed(status: Option<u16>, message: String) -> AppError {
        tracing::error!("Cloudinary upload failed: {}", message);
        AppError::Upload { status, message }
    }
}

/// Signature over the upload parameters.
///
/// Params with empty values are skipped; the rest are sorted by key, joined
/// as `k=v&k=v`, suffixed with the API secret and hashed with SHA-256.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut signed: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));
    let joined = signed
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl BlobHost for CloudinaryClient {
    async fn upload(&self, path: &Path, options: &UploadOptions) -> AppResult<HostedAsset> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();
        let signature = sign(
            &[
                ("folder", options.folder.clone()),
                ("timestamp", timestamp.clone()),
            ],
            &self.api_secret,
        );

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        if !options.folder.is_empty() {
            form = form.text("folder", options.folder.clone());
        }

        let url = format!(
            "{}/v1_1/{}/{}/upload",
            self.base_url,
            self.cloud_name,
            options.resource_type.as_str()
        );
        tracing::info!("Uploading {} to Cloudinary folder '{}'", path.display(), options.folder);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::upload_failed(None, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let asset: HostedAsset = response
                .json()
                .await
                .map_err(|e| Self::upload_failed(Some(status.as_u16()), e.to_string()))?;
            tracing::info!(
                public_id = %asset.public_id,
                secure_url = %asset.secure_url,
                format = ?asset.format,
                bytes = ?asset.bytes,
                "Cloudinary upload successful"
            );
            Ok(asset)
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            Err(Self::upload_failed(Some(status.as_u16()), body))
        }
    }

    async fn ping(&self) -> AppResult<Value> {
        let url = format!("{}/v1_1/{}/ping", self.base_url, self.cloud_name);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Upstream {
                service: "Cloudinary",
                status: status.as_u16(),
                body,
            })
        }
    }
}
