use report::{MappingDefault, ReportData};
use serde::Serialize;

use crate::step::AnalysisStep;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisState {
    #[default]
    Idle,
    Analyzing,
    Complete,
    Error,
}

impl AnalysisState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Non-fatal conditions worth showing next to a finished report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    NoClaimsFound,
}

pub const INITIAL_MESSAGE: &str = "Initializing...";

/// Everything an observer needs to render one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    pub state: AnalysisState,
    pub progress: u8,
    pub current_step: AnalysisStep,
    pub file_name: String,
    pub message: String,
    pub error: Option<String>,
    pub job_id: Option<String>,
    pub report: Option<ReportData>,
    /// Pipeline stage of the last partial report, e.g. `extraction_complete`
    pub stage: Option<String>,
    pub defaults: Vec<MappingDefault>,
    pub notice: Option<Notice>,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            state: AnalysisState::Idle,
            progress: 0,
            current_step: AnalysisStep::default(),
            file_name: String::new(),
            message: INITIAL_MESSAGE.to_string(),
            error: None,
            job_id: None,
            report: None,
            stage: None,
            defaults: Vec::new(),
            notice: None,
        }
    }
}

impl AnalysisSnapshot {
    pub(crate) fn starting(file_name: &str) -> Self {
        Self {
            state: AnalysisState::Analyzing,
            progress: 5,
            file_name: file_name.to_string(),
            ..Self::default()
        }
    }

    pub fn claim_count(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.claims.len())
    }
}
