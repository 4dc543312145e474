use client::ApiError;
use thiserror::Error;

pub(crate) const UPLOAD_FALLBACK: &str = "Upload failed. Please check file format.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no files to upload")]
    NothingToUpload,

    /// Shows the server's `detail` when there is one, else a generic hint.
    #[error("{}", upload_message(.0))]
    Upload(#[source] ApiError),

    #[error("Could not reset session: {}", reset_message(.0))]
    Reset(#[source] ApiError),
}

fn upload_message(err: &ApiError) -> &str {
    err.server_detail().unwrap_or(UPLOAD_FALLBACK)
}

fn reset_message(err: &ApiError) -> String {
    err.detail()
}
