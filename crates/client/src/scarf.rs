use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;
use crate::http;
use crate::types::{JobStatus, UploadFile, UploadReceipt};

/// The paper-analysis backend: upload a paper, poll its job, fetch the report.
#[async_trait]
pub trait ScarfApi: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<UploadReceipt, ApiError>;

    async fn status(&self, job_id: &str) -> Result<JobStatus, ApiError>;

    /// Raw report JSON; shape varies with the pipeline version.
    async fn report(&self, job_id: &str) -> Result<serde_json::Value, ApiError>;
}

#[derive(Clone)]
pub struct ScarfClient {
    base_url: String,
    client: reqwest::Client,
}

impl ScarfClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: http::trim_base_url(base_url.into()),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: http::trim_base_url(base_url.into()),
            client: http::build_client(Some(timeout))?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for ScarfClient {
    fn default() -> Self {
        Self::new(crate::DEFAULT_SCARF_URL)
    }
}

#[async_trait]
impl ScarfApi for ScarfClient {
    async fn upload(&self, file: &UploadFile) -> Result<UploadReceipt, ApiError> {
        let endpoint = "POST /upload";
        let url = format!("{}/upload", self.base_url);

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(file.mime())
            .map_err(ApiError::Builder)?;
        let form = Form::new().part("file", part);

        debug!(file = %file.name, bytes = file.bytes.len(), "Uploading paper");
        let response = http::send(endpoint, self.client.post(&url).multipart(form)).await?;
        http::read_json(endpoint, response).await
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let endpoint = format!("GET /status/{}", job_id);
        let url = format!("{}/status/{}", self.base_url, urlencoding::encode(job_id));

        let response = http::send(&endpoint, self.client.get(&url)).await?;
        http::read_json(&endpoint, response).await
    }

    async fn report(&self, job_id: &str) -> Result<serde_json::Value, ApiError> {
        let endpoint = format!("GET /report/{}", job_id);
        let url = format!("{}/report/{}", self.base_url, urlencoding::encode(job_id));

        let response = http::send(&endpoint, self.client.get(&url)).await?;
        http::read_json(&endpoint, response).await
    }
}
