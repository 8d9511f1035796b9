//! Env-driven configuration for the relay and the CLI.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults are provided for everything except credentials.
//! Credentials are validated when a client is built from them, so the server
//! can still start and answer health probes without them.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::replicate::poll::PollPolicy;

pub const DEFAULT_MODEL_VERSION: &str =
    "cbf059cce30a22d821a3c86309ae3b037dcd505dd2eba47f8ea6eba20adced85";
pub const DEFAULT_PROMPT: &str = "tileable fabric pattern";

/// Which path `/generate-texture` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Host the image, then run a job on the prediction service.
    Replicate,
    /// Run the local predictor script.
    Local,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Replicate => "replicate",
            Backend::Local => "local",
        }
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replicate" | "hosted" => Ok(Backend::Replicate),
            "local" => Ok(Backend::Local),
            other => Err(AppError::Configuration(format!(
                "Invalid BACKEND '{}', expected 'replicate' or 'local'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplicateSettings {
    pub api_token: String,
    pub base_url: String,
    pub model_version: String,
}

#[derive(Debug, Clone)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub backend: Backend,
    pub replicate_api_token: Option<String>,
    pub replicate_base_url: String,
    pub replicate_model_version: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    pub cloudinary_base_url: String,
    pub cloudinary_folder: String,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub public_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub predictor_script: PathBuf,
    pub python_candidates: Vec<String>,
    pub default_prompt: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            api_host: or("API_HOST", "127.0.0.1"),
            api_port: parse_or(&get, "API_PORT", 3000)?,
            backend: parse_or(&get, "BACKEND", Backend::Replicate)?,
            replicate_api_token: get("REPLICATE_API_TOKEN"),
            replicate_base_url: or("REPLICATE_BASE_URL", "https://api.replicate.com"),
            replicate_model_version: or("REPLICATE_MODEL_VERSION", DEFAULT_MODEL_VERSION),
            cloudinary_cloud_name: get("CLOUDINARY_CLOUD_NAME"),
            cloudinary_api_key: get("CLOUDINARY_API_KEY"),
            cloudinary_api_secret: get("CLOUDINARY_API_SECRET"),
            cloudinary_base_url: or("CLOUDINARY_BASE_URL", "https://api.cloudinary.com"),
            cloudinary_folder: or("CLOUDINARY_FOLDER", "avatar-vton"),
            upload_dir: PathBuf::from(or("UPLOAD_DIR", "uploads")),
            output_dir: PathBuf::from(or("OUTPUT_DIR", "outputs")),
            public_dir: PathBuf::from(or("PUBLIC_DIR", "public")),
            poll_interval_ms: parse_or(&get, "POLL_INTERVAL_MS", 2000)?,
            poll_max_attempts: parse_or(&get, "POLL_MAX_ATTEMPTS", 60)?,
            predictor_script: PathBuf::from(or("PREDICTOR_SCRIPT", "standalone_predictor.py")),
            python_candidates: or("PYTHON_CANDIDATES", "py,python,python3")
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            default_prompt: or("DEFAULT_PROMPT", DEFAULT_PROMPT),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }

    pub fn replicate(&self) -> AppResult<ReplicateSettings> {
        let api_token = self.replicate_api_token.clone().ok_or_else(|| {
            AppError::Configuration("Replicate API token not configured".to_string())
        })?;
        Ok(ReplicateSettings {
            api_token,
            base_url: self.replicate_base_url.clone(),
            model_version: self.replicate_model_version.clone(),
        })
    }

    pub fn cloudinary(&self) -> AppResult<CloudinarySettings> {
        match (
            &self.cloudinary_cloud_name,
            &self.cloudinary_api_key,
            &self.cloudinary_api_secret,
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(CloudinarySettings {
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
                base_url: self.cloudinary_base_url.clone(),
            }),
            _ => Err(AppError::Configuration(
                "Cloudinary credentials not configured".to_string(),
            )),
        }
    }

    /// Log the effective settings. Secrets are only reported as set/unset.
    pub fn log_summary(&self) {
        let secret = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        tracing::info!("BACKEND: {}", self.backend.as_str());
        tracing::info!("API_HOST: {}, API_PORT: {}", self.api_host, self.api_port);
        tracing::info!("REPLICATE_BASE_URL: {}", self.replicate_base_url);
        tracing::info!("REPLICATE_API_TOKEN: {}", secret(&self.replicate_api_token));
        tracing::info!(
            "CLOUDINARY_CLOUD_NAME: {}",
            self.cloudinary_cloud_name.as_deref().unwrap_or("<unset>")
        );
        tracing::info!("CLOUDINARY_API_KEY: {}", secret(&self.cloudinary_api_key));
        tracing::info!("CLOUDINARY_API_SECRET: {}", secret(&self.cloudinary_api_secret));
        tracing::info!(
            "Polling every {}ms, at most {} attempts",
            self.poll_interval_ms,
            self.poll_max_attempts
        );
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::Configuration(format!("Invalid {} '{}'", key, raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppResult<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_port, 3000);
        assert_eq!(config.backend, Backend::Replicate);
        assert_eq!(config.default_prompt, "tileable fabric pattern");
        assert_eq!(config.python_candidates, vec!["py", "python", "python3"]);
        assert_eq!(
            config.poll_policy(),
            PollPolicy::new(Duration::from_millis(2000), 60)
        );
    }

    #[test]
    fn missing_token_fails_replicate_settings() {
        let config = config_from(&[("REPLICATE_API_TOKEN", "  ")]).unwrap();
        let err = config.replicate().unwrap_err();
        assert_eq!(err.to_string(), "Replicate API token not configured");
    }

    #[test]
    fn cloudinary_requires_all_three_credentials() {
        let partial = config_from(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
        ])
        .unwrap();
        assert!(matches!(partial.cloudinary(), Err(AppError::Configuration(_))));

        let full = config_from(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
        ])
        .unwrap();
        let settings = full.cloudinary().unwrap();
        assert_eq!(settings.cloud_name, "demo");
        assert_eq!(settings.base_url, "https://api.cloudinary.com");
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("POLL_MAX_ATTEMPTS", "lots")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid POLL_MAX_ATTEMPTS 'lots'");
    }

    #[test]
    fn backend_parsing() {
        let config = config_from(&[("BACKEND", "Local")]).unwrap();
        assert_eq!(config.backend, Backend::Local);
        assert!(config_from(&[("BACKEND", "gpu")]).is_err());
    }
}
