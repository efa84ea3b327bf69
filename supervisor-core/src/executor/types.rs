//! Executor input/output types (spec §4.7).

use serde::{Deserialize, Serialize};

use crate::action::Action;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Skip,
    Blocked,
    Error,
}

/// One structured per-action outcome (label, status, note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub label: String,
    pub status: ResultStatus,
    pub note: String,
}

impl ActionResult {
    pub fn ok(label: impl Into<String>, note: impl Into<String>) -> Self {
        ActionResult { label: label.into(), status: ResultStatus::Ok, note: note.into() }
    }

    pub fn skip(label: impl Into<String>, note: impl Into<String>) -> Self {
        ActionResult { label: label.into(), status: ResultStatus::Skip, note: note.into() }
    }

    pub fn blocked(label: impl Into<String>, note: impl Into<String>) -> Self {
        ActionResult { label: label.into(), status: ResultStatus::Blocked, note: note.into() }
    }

    pub fn error(label: impl Into<String>, note: impl Into<String>) -> Self {
        ActionResult { label: label.into(), status: ResultStatus::Error, note: note.into() }
    }
}

/// Output envelope appended for each dispatched action (agent identity, mode, text, extras).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutput {
    pub agent_id: Option<String>,
    pub provider: Option<String>,
    pub mode: String,
    pub text: String,
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Accumulated effect of running a plan to completion or to a stopping point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub results: Vec<ActionResult>,
    pub outputs: Vec<ActionOutput>,
    pub current_job_id: Option<String>,
    pub detail_context: Option<String>,
    pub pending_approval: Option<crate::session::PendingApproval>,
    pub blocked_index: Option<usize>,
    pub remaining_actions: Vec<Action>,
}

impl ExecutionOutcome {
    pub fn empty() -> Self {
        ExecutionOutcome {
            results: Vec::new(),
            outputs: Vec::new(),
            current_job_id: None,
            detail_context: None,
            pending_approval: None,
            blocked_index: None,
            remaining_actions: Vec::new(),
        }
    }
}
