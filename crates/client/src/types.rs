use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ApiError;

/// A document held in memory, ready to be sent as a multipart part.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidPath(path.display().to_string()))?;

        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self { name, bytes })
    }

    pub(crate) fn mime(&self) -> &'static str {
        let extension = Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => "application/pdf",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Some("txt") => "text/plain",
            Some("md") => "text/markdown",
            _ => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Server-side job status. Anything other than the three well-known values
/// (`PROCESSING_OCR`, ...) is still a running job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    #[default]
    Pending,
    Completed,
    Failed,
    Running(String),
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PENDING" => Self::Pending,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Running(raw),
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => "PENDING".to_string(),
            JobState::Completed => "COMPLETED".to_string(),
            JobState::Failed => "FAILED".to_string(),
            JobState::Running(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub status: Option<JobState>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub partial_results: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        self.status.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub chunks_processed: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub question: &'a str,
    pub filenames: &'a [String],
    pub session_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub status: String,
    #[serde(default)]
    pub deleted_count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_state_parsing() {
        let status: JobStatus = serde_json::from_value(json!({
            "status": "PROCESSING_OCR",
            "progress": 10,
            "message": "Grounding PDF (OCR)..."
        }))
        .unwrap();

        assert_eq!(status.state(), JobState::Running("PROCESSING_OCR".to_string()));
        assert_eq!(status.progress, Some(10.0));

        let done: JobStatus = serde_json::from_value(json!({"status": "COMPLETED"})).unwrap();
        assert_eq!(done.state(), JobState::Completed);
    }

    #[test]
    fn test_missing_status_is_pending() {
        let status: JobStatus = serde_json::from_value(json!({"status": null})).unwrap();
        assert_eq!(status.state(), JobState::Pending);
    }

    #[test]
    fn test_mime_by_extension() {
        assert_eq!(UploadFile::new("paper.PDF", vec![]).mime(), "application/pdf");
        assert_eq!(UploadFile::new("notes.md", vec![]).mime(), "text/markdown");
        assert_eq!(UploadFile::new("blob", vec![]).mime(), "application/octet-stream");
    }
}
