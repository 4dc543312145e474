pub mod error;
pub mod readify;
pub mod scarf;
pub mod types;

mod http;

pub use error::ApiError;
pub use readify::{ReadifyApi, ReadifyClient};
pub use scarf::{ScarfApi, ScarfClient};
pub use types::{
    DeleteReceipt, IngestReceipt, JobState, JobStatus, QueryAnswer, UploadFile, UploadReceipt,
};

pub const DEFAULT_SCARF_URL: &str = "http://localhost:9999";
pub const DEFAULT_READIFY_URL: &str = "http://localhost:8000/api";
