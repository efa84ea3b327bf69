//! Job metadata and the fixed tracking-doc set (spec §4.9).

use serde::{Deserialize, Serialize};

/// The four tracking documents every job is initialized with.
pub const TRACKING_DOCS: &[&str] = &["plan.md", "research.md", "progress.md", "decisions.md"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    pub job_id: String,
    pub title: String,
    pub owner_user_id: String,
    pub owner_chat_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl JobMeta {
    pub fn new(job_id: impl Into<String>, title: impl Into<String>, owner_user_id: impl Into<String>, owner_chat_id: impl Into<String>) -> Self {
        JobMeta {
            job_id: job_id.into(),
            title: title.into(),
            owner_user_id: owner_user_id.into(),
            owner_chat_id: owner_chat_id.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// One line of `conversation.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub ts: chrono::DateTime<chrono::Utc>,
    pub role: String,
    pub text: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}
