#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use texture_relay::api::AppState;
use texture_relay::cloudinary::{BlobHost, HostedAsset, UploadOptions};
use texture_relay::config::Backend;
use texture_relay::error::{AppError, AppResult};
use texture_relay::replicate::job::{Job, JobStatus, SubmissionRequest};
use texture_relay::replicate::PredictionService;
use texture_relay::{JobClient, LocalPredictor, PollPolicy};

pub const HOSTED_URL: &str = "https://res.cloudinary.com/demo/image/upload/avatar-vton/swatch.png";
pub const BOUNDARY: &str = "texture-relay-boundary";

/// Blob host that records uploads and can be told to fail.
#[derive(Default)]
pub struct FakeHost {
    pub fail: bool,
    pub uploads: Mutex<Vec<(PathBuf, UploadOptions, usize)>>,
}

impl FakeHost {
    pub fn failing() -> Self {
        FakeHost {
            fail: true,
            ..Default::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobHost for FakeHost {
    async fn upload(&self, path: &Path, options: &UploadOptions) -> AppResult<HostedAsset> {
        let size = tokio::fs::read(path).await.map(|b| b.len()).unwrap_or(0);
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_path_buf(), options.clone(), size));
        if self.fail {
            return Err(AppError::Upload {
                status: Some(401),
                message: r#"{"error":{"message":"Invalid Signature"}}"#.to_string(),
            });
        }
        Ok(HostedAsset {
            secure_url: HOSTED_URL.to_string(),
            public_id: "avatar-vton/swatch".to_string(),
            format: Some("png".to_string()),
            width: Some(512),
            height: Some(512),
            bytes: Some(size as u64),
        })
    }

    async fn ping(&self) -> AppResult<Value> {
        if self.fail {
            return Err(AppError::Upstream {
                service: "Cloudinary",
                status: 401,
                body: "unauthorized".to_string(),
            });
        }
        Ok(json!({ "status": "ok" }))
    }
}

/// Prediction service answering `processing` for `pending` fetches, then `last`.
pub struct FakePredictions {
    pub pending: usize,
    pub last: JobStatus,
    pub reject: Option<(u16, String)>,
    pub ping_status: Option<u16>,
    pub creates: AtomicUsize,
    pub gets: AtomicUsize,
    pub requests: Mutex<Vec<SubmissionRequest>>,
}

impl FakePredictions {
    pub fn new(pending: usize, last: JobStatus) -> Self {
        FakePredictions {
            pending,
            last,
            reject: None,
            ping_status: None,
            creates: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(status: u16, body: &str) -> Self {
        let mut fake = FakePredictions::new(0, JobStatus::Succeeded);
        fake.reject = Some((status, body.to_string()));
        fake
    }

    /// Answers the connectivity check with a non-success status.
    pub fn refusing_ping(status: u16) -> Self {
        let mut fake = FakePredictions::new(0, JobStatus::Succeeded);
        fake.ping_status = Some(status);
        fake
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionService for FakePredictions {
    async fn create(&self, request: &SubmissionRequest) -> AppResult<Job> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some((status, body)) = &self.reject {
            return Err(AppError::Submission {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(Job::new("rrr4z55ocneqzikepnug6xezpe", JobStatus::Starting))
    }

    async fn get(&self, id: &str) -> AppResult<Job> {
        let n = self.gets.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.pending {
            return Ok(Job::new(id, JobStatus::Processing));
        }
        let job = Job::new(id, self.last.clone());
        Ok(match self.last {
            JobStatus::Succeeded => job.with_output(json!(["https://replicate.delivery/pbxt/texture.png"])),
            _ => job.with_error(json!("NSFW content detected")),
        })
    }

    async fn ping(&self) -> AppResult<u16> {
        match self.ping_status {
            Some(status) => Err(AppError::Upstream {
                service: "Replicate",
                status,
                body: r#"{"title":"Unauthenticated","detail":"You did not pass a valid authentication token","status":401}"#
                    .to_string(),
            }),
            None => Ok(200),
        }
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(1), 60)
}

pub fn hosted_state(
    dir: &Path,
    host: Option<Arc<FakeHost>>,
    predictions: Option<Arc<FakePredictions>>,
) -> Arc<AppState> {
    Arc::new(AppState {
        backend: Backend::Replicate,
        jobs: predictions.map(|p| JobClient::new(p, fast_policy())),
        blob_host: host.map(|h| h as Arc<dyn BlobHost>),
        predictor: LocalPredictor::new(
            vec!["bash".to_string()],
            dir.join("predictor.sh"),
            dir.join("outputs"),
        ),
        upload_dir: dir.join("uploads"),
        output_dir: dir.join("outputs"),
        public_dir: dir.join("public"),
        cloudinary_folder: "avatar-vton".to_string(),
        default_prompt: "tileable fabric pattern".to_string(),
        max_upload_bytes: 1024 * 1024,
    })
}

/// PNG signature followed by filler up to `size` bytes.
pub fn png_fixture(size: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(size, 0x42);
    bytes
}

pub fn multipart_body(image: Option<&[u8]>, prompt: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"swatch.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(prompt) = prompt {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\n{prompt}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn dir_is_empty(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
