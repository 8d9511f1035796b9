//! Locates a usable Python interpreter for the local predictor.
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{AppError, AppResult};

/// Return the first candidate whose `--version` exits successfully.
pub async fn detect_interpreter(candidates: &[String]) -> AppResult<String> {
    for candidate in candidates {
        let status = Command::new(candidate)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => {
                tracing::info!("Found Python command: {}", candidate);
                return Ok(candidate.clone());
            }
            Ok(status) => tracing::debug!("{} --version exited with {}", candidate, status),
            Err(e) => tracing::debug!("{} is not runnable: {}", candidate, e),
        }
    }
    Err(AppError::LocalPredictor(
        "No Python installation found. Please install Python from python.org".to_string(),
    ))
}
