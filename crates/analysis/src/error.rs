use client::ApiError;
use thiserror::Error;

/// Why an analysis ended in the error state. The `Display` text is what the
/// snapshot's `error` field carries.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Upload failed: {}", server_detail(.0))]
    Upload(#[source] ApiError),

    #[error("Analysis job not found. The server may have restarted.")]
    JobNotFound,

    /// `after` is already worded, e.g. "20 minutes" or "90 seconds"
    #[error("Analysis timed out after {after}. The document may be too large or complex.")]
    TimedOut { after: String },

    #[error("Status polling gave up after {attempts} consecutive failures")]
    Unreachable { attempts: u32 },

    #[error("{0}")]
    BackendFailed(String),

    #[error("Failed to fetch report: {0}")]
    Report(#[source] ApiError),
}

fn server_detail(err: &ApiError) -> String {
    err.detail()
}

pub(crate) const BACKEND_FAILED_FALLBACK: &str = "Analysis failed on backend";
