//! Blob hosting: turns a local file into a public URL.
pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// Let the host detect the type from the content.
    Auto,
    Image,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Auto => "auto",
            ResourceType::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub folder: String,
    pub resource_type: ResourceType,
}

impl UploadOptions {
    pub fn new(folder: impl Into<String>, resource_type: ResourceType) -> Self {
        UploadOptions {
            folder: folder.into(),
            resource_type,
        }
    }
}

/// Upload result. Only `secure_url` is required by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedAsset {
    pub secure_url: String,
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

#[async_trait]
pub trait BlobHost: Send + Sync {
    async fn upload(&self, path: &Path, options: &UploadOptions) -> AppResult<HostedAsset>;

    /// Connectivity probe; returns the host's answer as JSON.
    async fn ping(&self) -> AppResult<Value>;
}
