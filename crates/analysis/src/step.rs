use serde::{Deserialize, Serialize};

/// The six user-visible stages of an analysis, in pipeline order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    #[default]
    ExtractingText,
    DetectingStructure,
    FindingClaims,
    LinkingEvidence,
    IdentifyingGaps,
    GeneratingQuestions,
}

impl AnalysisStep {
    pub const ALL: [AnalysisStep; 6] = [
        Self::ExtractingText,
        Self::DetectingStructure,
        Self::FindingClaims,
        Self::LinkingEvidence,
        Self::IdentifyingGaps,
        Self::GeneratingQuestions,
    ];

    /// Thresholds: <20, <35, <50, <65, <80, then the last step (100 included).
    pub fn from_progress(progress: f64) -> Self {
        if progress < 20.0 {
            Self::ExtractingText
        } else if progress < 35.0 {
            Self::DetectingStructure
        } else if progress < 50.0 {
            Self::FindingClaims
        } else if progress < 65.0 {
            Self::LinkingEvidence
        } else if progress < 80.0 {
            Self::IdentifyingGaps
        } else {
            Self::GeneratingQuestions
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ExtractingText => "Extracting Text",
            Self::DetectingStructure => "Detecting Structure",
            Self::FindingClaims => "Finding Claims",
            Self::LinkingEvidence => "Linking Evidence",
            Self::IdentifyingGaps => "Identifying Gaps",
            Self::GeneratingQuestions => "Generating Questions",
        }
    }
}
