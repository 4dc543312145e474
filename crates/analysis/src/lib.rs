pub mod config;
pub mod error;
pub mod machine;
pub mod metrics;
pub mod state;
pub mod step;

pub use config::PollConfig;
pub use error::AnalysisError;
pub use machine::AnalysisMachine;
pub use metrics::{PollMetrics, PollMetricsSnapshot};
pub use state::{AnalysisSnapshot, AnalysisState, Notice};
pub use step::AnalysisStep;
