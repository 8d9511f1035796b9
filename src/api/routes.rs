//! Shared state and router setup.
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::api::handlers;
use crate::cloudinary::client::CloudinaryClient;
use crate::cloudinary::BlobHost;
use crate::config::{Backend, Config};
use crate::local::predictor::LocalPredictor;
use crate::replicate::client::ReplicateClient;
use crate::replicate::poll::JobClient;

/// Immutable per-process state. Clients are `None` when their credentials
/// are missing; requests that need them then fail with a configuration error.
pub struct AppState {
    pub backend: Backend,
    pub jobs: Option<JobClient>,
    pub blob_host: Option<Arc<dyn BlobHost>>,
    pub predictor: LocalPredictor,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub public_dir: PathBuf,
    pub cloudinary_folder: String,
    pub default_prompt: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let jobs = match config.replicate().and_then(ReplicateClient::new) {
            Ok(client) => Some(JobClient::new(Arc::new(client), config.poll_policy())),
            Err(e) => {
                if config.backend == Backend::Replicate {
                    tracing::warn!("{}; generate requests will fail", e);
                }
                None
            }
        };
        let blob_host: Option<Arc<dyn BlobHost>> =
            match config.cloudinary().and_then(CloudinaryClient::new) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!("{}; image hosting disabled", e);
                    None
                }
            };

        AppState {
            backend: config.backend,
            jobs,
            blob_host,
            predictor: LocalPredictor::new(
                config.python_candidates.clone(),
                config.predictor_script.clone(),
                config.output_dir.clone(),
            ),
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            public_dir: config.public_dir.clone(),
            cloudinary_folder: config.cloudinary_folder.clone(),
            default_prompt: config.default_prompt.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let outputs = ServeDir::new(&state.output_dir);
    let public = ServeDir::new(&state.public_dir);
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/generate-texture", post(handlers::generate_texture))
        .route("/test-cloudinary", get(handlers::test_cloudinary))
        .route("/test-replicate", get(handlers::test_replicate))
        .route("/health", get(handlers::health))
        .nest_service("/outputs", outputs)
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
