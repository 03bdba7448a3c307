use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{Diagram, ProcessedContent, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Immutable once appended; the only exception is the
/// pending placeholder, which is replaced wholesale when its round-trip
/// completes or fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagrams: Vec<Diagram>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(skip)]
    pub pending: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            segments: Vec::new(),
            sources: Vec::new(),
            diagrams: Vec::new(),
            is_error: false,
            pending: false,
        }
    }

    /// Assemble an assistant message from post-processed reply content.
    pub fn assistant(processed: ProcessedContent, sources: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: processed.cleaned_text,
            timestamp: Utc::now(),
            segments: processed.segments,
            sources,
            diagrams: processed.diagrams,
            is_error: false,
            pending: false,
        }
    }

    pub fn error(reason: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: format!("Sorry, I encountered an error: {reason}"),
            timestamp: Utc::now(),
            segments: Vec::new(),
            sources: Vec::new(),
            diagrams: Vec::new(),
            is_error: true,
            pending: false,
        }
    }

    /// Placeholder shown while a round-trip is in flight.
    pub fn placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            segments: Vec::new(),
            sources: Vec::new(),
            diagrams: Vec::new(),
            is_error: false,
            pending: true,
        }
    }
}
