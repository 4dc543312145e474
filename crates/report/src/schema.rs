use serde::{Deserialize, Serialize};

/// Flat view of an analysed paper: its sections and the claims found in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub sections: Vec<Section>,
    pub claims: Vec<Claim>,
}

impl ReportData {
    pub fn evidence_count(&self) -> usize {
        self.claims.iter().map(|c| c.evidence.len()).sum()
    }

    pub fn gap_count(&self) -> usize {
        self.claims.iter().map(|c| c.gaps.len()).sum()
    }

    pub fn question_count(&self) -> usize {
        self.claims.iter().map(|c| c.questions.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub page: u32,
    #[serde(rename = "type")]
    pub role: SectionRole,
}

/// Rhetorical role of a section. Unknown roles collapse to `Body`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionRole {
    Abstract,
    Introduction,
    Background,
    Method,
    Results,
    Discussion,
    Limitations,
    Conclusion,
    #[default]
    Body,
}

impl SectionRole {
    pub fn parse(raw: &str) -> Option<Self> {
        let role = match raw.trim().to_ascii_lowercase().as_str() {
            "abstract" => Self::Abstract,
            "introduction" => Self::Introduction,
            "background" => Self::Background,
            "method" | "methods" => Self::Method,
            "results" | "result" => Self::Results,
            "discussion" => Self::Discussion,
            "limitations" | "limitation" => Self::Limitations,
            "conclusion" | "conclusions" => Self::Conclusion,
            "body" => Self::Body,
            _ => return None,
        };
        Some(role)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::Introduction => "introduction",
            Self::Background => "background",
            Self::Method => "method",
            Self::Results => "results",
            Self::Discussion => "discussion",
            Self::Limitations => "limitations",
            Self::Conclusion => "conclusion",
            Self::Body => "body",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub statement: String,
    pub confidence: Confidence,
    pub evidence: Vec<Evidence>,
    pub gaps: Vec<Gap>,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assumptions: Vec<Assumption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// `> 0.8` is high, `> 0.5` is medium, everything else (0.5 included) is low.
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Self::High
        } else if score > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub text: String,
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    #[serde(rename = "type")]
    pub kind: GapKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKind {
    Missing,
    Assumption,
    Weak,
}

impl GapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Assumption => "assumption",
            Self::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
}

/// Implicit premise the claim relies on (data, model or evaluation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    #[serde(rename = "type")]
    pub kind: String,
    pub statement: String,
    pub confidence: Confidence,
}
