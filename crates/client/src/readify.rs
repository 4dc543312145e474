use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;
use crate::http;
use crate::types::{DeleteReceipt, IngestReceipt, QueryAnswer, QueryRequest, UploadFile};

/// The document-chat backend. Every call is scoped by a client-generated session id.
#[async_trait]
pub trait ReadifyApi: Send + Sync {
    async fn upload(&self, files: &[UploadFile], session_id: &str)
    -> Result<IngestReceipt, ApiError>;

    async fn query(
        &self,
        question: &str,
        filenames: &[String],
        session_id: &str,
    ) -> Result<QueryAnswer, ApiError>;

    async fn reset(&self, session_id: &str) -> Result<DeleteReceipt, ApiError>;

    async fn delete_file(&self, filename: &str, session_id: &str)
    -> Result<DeleteReceipt, ApiError>;
}

#[derive(Clone)]
pub struct ReadifyClient {
    base_url: String,
    client: reqwest::Client,
}

impl ReadifyClient {
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

impl Default for ReadifyClient {
    fn default() -> Self {
        Self::new(crate::DEFAULT_READIFY_URL)
    }
}

#[async_trait]
impl ReadifyApi for ReadifyClient {
    async fn upload(
        &self,
        files: &[UploadFile],
        session_id: &str,
    ) -> Result<IngestReceipt, ApiError> {
        let endpoint = "POST /upload";
        let url = format!("{}/upload", self.base_url);

        // Field name must match the backend's `files: list[UploadFile]`
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(file.mime())
                .map_err(ApiError::Builder)?;
            form = form.part("files", part);
        }
        form = form.text("session_id", session_id.to_string());

        debug!(session_id, files = files.len(), "Uploading documents");
        let response = http::send(endpoint, self.client.post(&url).multipart(form)).await?;
        http::read_json(endpoint, response).await
    }

    async fn query(
        &self,
        question: &str,
        filenames: &[String],
        session_id: &str,
    ) -> Result<QueryAnswer, ApiError> {
        let endpoint = "POST /query";
        let url = format!("{}/query", self.base_url);

        let request = QueryRequest {
            question,
            filenames,
            session_id,
        };

        let response = http::send(endpoint, self.client.post(&url).json(&request)).await?;
        http::read_json(endpoint, response).await
    }

    async fn reset(&self, session_id: &str) -> Result<DeleteReceipt, ApiError> {
        let endpoint = format!("DELETE /reset/{}", session_id);
        let url = format!("{}/reset/{}", self.base_url, urlencoding::encode(session_id));

        let response = http::send(&endpoint, self.client.delete(&url)).await?;
        http::read_json(&endpoint, response).await
    }

    async fn delete_file(
        &self,
        filename: &str,
        session_id: &str,
    ) -> Result<DeleteReceipt, ApiError> {
        let endpoint = format!("DELETE /files/{}/{}", session_id, filename);
        let url = format!(
            "{}/files/{}/{}",
            self.base_url,
            urlencoding::encode(session_id),
            urlencoding::encode(filename)
        );

        let response = http::send(&endpoint, self.client.delete(&url)).await?;
        http::read_json(&endpoint, response).await
    }
}
