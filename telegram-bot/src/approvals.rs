//! Inline approve/deny buttons and the on-disk pending-approval token (spec §6 `approve:<jobId>:<token>`
//! / `deny:<jobId>:<token>`, spec §7 "approval-pending runs post an inline approve/deny button").

use std::path::{Path, PathBuf};

use supervisor_core::session::PendingApproval;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

#[derive(Debug, thiserror::Error)]
pub enum ApprovalTokenError {
    #[error("read approval token: {0}")]
    Read(std::io::Error),
    #[error("write approval token: {0}")]
    Write(std::io::Error),
    #[error("parse approval token: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("approval token not found")]
    NotFound,
}

fn token_path(runs_dir: &Path, job_id: &str, token: &str) -> PathBuf {
    runs_dir.join(job_id).join("approvals").join(format!("{token}.json"))
}

/// Persists the pending approval under `<jobDir>/approvals/<token>.json`, keyed by its own id.
pub async fn save(runs_dir: &Path, pending: &PendingApproval) -> Result<(), ApprovalTokenError> {
    let path = token_path(runs_dir, &pending.job_id, &pending.id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(ApprovalTokenError::Write)?;
    }
    let json = serde_json::to_string_pretty(pending)?;
    tokio::fs::write(&path, json).await.map_err(ApprovalTokenError::Write)?;
    Ok(())
}

pub async fn load(runs_dir: &Path, job_id: &str, token: &str) -> Result<PendingApproval, ApprovalTokenError> {
    let path = token_path(runs_dir, job_id, token);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApprovalTokenError::NotFound),
        Err(e) => Err(ApprovalTokenError::Read(e)),
    }
}

pub async fn remove(runs_dir: &Path, job_id: &str, token: &str) {
    let _ = tokio::fs::remove_file(token_path(runs_dir, job_id, token)).await;
}

pub fn keyboard(job_id: &str, token: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Approve", format!("approve:{job_id}:{token}")),
        InlineKeyboardButton::callback("Deny", format!("deny:{job_id}:{token}")),
    ]])
}

/// Splits `approve:<jobId>:<token>` / `deny:<jobId>:<token>` callback data.
pub fn parse_callback_data(data: &str) -> Option<(bool, &str, &str)> {
    let (verb, rest) = data.split_once(':')?;
    let (job_id, token) = rest.split_once(':')?;
    let approve = match verb {
        "approve" => true,
        "deny" => false,
        _ => return None,
    };
    Some((approve, job_id, token))
}
