//! Texture relay library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `replicate`: Prediction service client plus the submit-and-poll `JobClient`.
//! - `cloudinary`: Blob hosting client that turns local files into public URLs.
//! - `local`: Runs the local predictor script through a detected interpreter.
//! - `pipeline`: Per-request hosted and local generation flows.
//! - `utils`: Request-scoped temporary upload files.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `JobClient`,
//! `ReplicateClient`, `CloudinaryClient` and `LocalPredictor`.
pub mod api;
pub mod cloudinary;
pub mod config;
pub mod error;
pub mod local;
pub mod pipeline;
pub mod replicate;
pub mod utils;

pub use cloudinary::client::CloudinaryClient;
pub use config::Config;
pub use local::predictor::LocalPredictor;
pub use replicate::client::ReplicateClient;
pub use replicate::poll::{JobClient, PollPolicy};
