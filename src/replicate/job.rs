//! Prediction job as reported by the service, and the request that creates one.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// Any status string the service adds later, kept verbatim. Treated as
    /// still running.
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "starting" => JobStatus::Starting,
            "processing" => JobStatus::Processing,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            "canceled" => JobStatus::Canceled,
            _ => JobStatus::Other(raw),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of a prediction. Refetch by `id` to observe progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Job {
            id: id.into(),
            status,
            output: None,
            error: None,
            logs: None,
            metrics: None,
            urls: None,
            created_at: None,
            completed_at: None,
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A hosted resource plus free-form model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    resource_url: String,
    parameters: Map<String, Value>,
}

impl SubmissionRequest {
    pub fn new(resource_url: impl Into<String>, parameters: Map<String, Value>) -> Self {
        SubmissionRequest {
            resource_url: resource_url.into(),
            parameters,
        }
    }

    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Model input: the parameters with `image` pointing at the resource.
    pub fn to_input(&self) -> Value {
        let mut input = self.parameters.clone();
        input.insert(
            "image".to_string(),
            Value::String(self.resource_url.clone()),
        );
        Value::Object(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_a_service_payload() {
        let raw = json!({
            "id": "gm3qorzdhgbfurvjtvhg6dckhu",
            "version": "cbf059cc",
            "status": "processing",
            "input": { "prompt": "tileable fabric pattern" },
            "output": null,
            "error": null,
            "logs": "step 3/50",
            "urls": { "get": "https://api.replicate.com/v1/predictions/gm3qorzdhgbfurvjtvhg6dckhu" }
        });
        let job: Job = serde_json::from_value(raw).unwrap();
        assert_eq!(job.id, "gm3qorzdhgbfurvjtvhg6dckhu");
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.output.is_none());
        assert_eq!(job.logs.as_deref(), Some("step 3/50"));
        assert!(!job.is_terminal());
    }

    #[test]
    fn unknown_status_is_not_terminal() {
        let job: Job = serde_json::from_value(json!({ "id": "x", "status": "queued" })).unwrap();
        assert_eq!(job.status, JobStatus::Other("queued".to_string()));
        assert!(!job.is_terminal());
    }

    #[test]
    fn unknown_status_is_reported_verbatim() {
        let job: Job = serde_json::from_value(json!({ "id": "x", "status": "queued" })).unwrap();
        assert_eq!(job.status.to_string(), "queued");
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({ "id": "x", "status": "queued" })
        );

        let known = serde_json::to_value(Job::new("y", JobStatus::Canceled)).unwrap();
        assert_eq!(known["status"], "canceled");
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn input_points_image_at_the_resource() {
        let mut params = Map::new();
        params.insert("prompt".into(), json!("tileable fabric pattern"));
        params.insert("image".into(), json!("ignored"));
        let request = SubmissionRequest::new("https://res.cloudinary.com/demo/a.png", params);
        assert_eq!(
            request.to_input(),
            json!({
                "image": "https://res.cloudinary.com/demo/a.png",
                "prompt": "tileable fabric pattern"
            })
        );
    }
}
