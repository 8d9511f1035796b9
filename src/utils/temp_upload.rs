//! Request-scoped temporary file for an uploaded image.
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppResult;

/// Owns a file under the upload directory and deletes it when released or
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    released: bool,
}

impl TempUpload {
    /// Write `bytes` to a fresh file in `dir`, keeping the original extension.
    pub async fn persist(dir: &Path, bytes: &[u8], original_name: Option<&str>) -> AppResult<Self> {
        let upload = Self::reserve(dir, original_name).await?;
        tokio::fs::write(&upload.path, bytes).await?;
        tracing::debug!("Stored upload at {} ({} bytes)", upload.path.display(), bytes.len());
        Ok(upload)
    }

    /// Pick a fresh path in `dir`. The guard owns it before anything is
    /// written, so a failed write still cleans up.
    async fn reserve(dir: &Path, original_name: Option<&str>) -> AppResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));
        let file_name = match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        Ok(TempUpload {
            path: dir.join(file_name),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::info!("Local file cleaned up: {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
