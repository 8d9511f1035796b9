//! Runs the local generation script and reads its JSON result.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::process::Command;

use crate::error::{AppError, AppResult};
use crate::local::interpreter::detect_interpreter;

/// What the script prints with `--json-output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPrediction {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalPredictor {
    candidates: Vec<String>,
    script: PathBuf,
    output_dir: PathBuf,
}

impl LocalPredictor {
    pub fn new(candidates: Vec<String>, script: PathBuf, output_dir: PathBuf) -> Self {
        LocalPredictor {
            candidates,
            script,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn run(&self, prompt: &str, image: Option<&Path>) -> AppResult<LocalPrediction> {
        let interpreter = detect_interpreter(&self.candidates).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let output_path = self.output_dir.join(format!("texture_{}.png", millis));

        let mut command = Command::new(&interpreter);
        command
            .arg(&self.script)
            .arg("--prompt")
            .arg(prompt)
            .arg("--output")
            .arg(&output_path)
            .arg("--json-output");
        if let Some(image) = image {
            command.arg("--image").arg(image);
        }
        tracing::info!(
            "Running: {} {} --prompt {:?} --output {}{}",
            interpreter,
            self.script.display(),
            prompt,
            output_path.display(),
            image
                .map(|p| format!(" --image {}", p.display()))
                .unwrap_or_default()
        );

        let output = command.output().await.map_err(|e| {
            AppError::LocalPredictor(format!(
                "Failed to start Python process: {}. Make sure Python is installed and added to PATH.",
                e
            ))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::info!("Python stderr: {}", stderr.trim_end());
        }
        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(AppError::LocalPredictor(format!(
                "Python process failed with code {}: {}",
                code, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_output(&stdout, &output_path))
    }
}

/// Find the JSON result in the script's stdout.
///
/// The script prints progress lines before the result, so the whole output
/// is tried first and then the last non-empty line. Anything unparseable
/// counts as success with the chosen output path.
fn parse_output(stdout: &str, output_path: &Path) -> LocalPrediction {
    let trimmed = stdout.trim();
    let last_line = trimmed.lines().rev().find(|l| !l.trim().is_empty());
    serde_json::from_str(trimmed)
        .ok()
        .or_else(|| last_line.and_then(|l| serde_json::from_str(l.trim()).ok()))
        .unwrap_or_else(|| LocalPrediction {
            success: true,
            output_path: Some(output_path.display().to_string()),
            prompt: None,
            error: None,
        })
}
