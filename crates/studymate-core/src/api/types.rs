use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Message;

/// Reply from the completion endpoint: raw assistant text plus the sources
/// the backend asserts it used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionReply {
    #[serde(default)]
    pub response: String,
    #[serde(default, rename = "usedSources")]
    pub used_sources: Vec<String>,
}

/// Lightweight entry in the session listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full server-side session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}
