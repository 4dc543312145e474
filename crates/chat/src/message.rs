use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GREETING: &str = "Hello! I've analyzed your document. Ask me anything about it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), Vec::new())
    }

    pub fn assistant(content: impl Into<String>, citations: Vec<String>) -> Self {
        Self::new(Role::Assistant, content.into(), citations)
    }

    pub(crate) fn greeting() -> Self {
        Self::assistant(GREETING, Vec::new())
    }

    /// Assistant reply shown in place of an answer when the query failed.
    pub(crate) fn query_failure(detail: &str) -> Self {
        Self::assistant(
            format!(
                "I encountered an issue connecting to the knowledge base: {}. Please try again.",
                detail
            ),
            Vec::new(),
        )
    }

    fn new(role: Role, content: String, citations: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            citations,
            timestamp: Utc::now(),
        }
    }
}
