//! Per-chat session state (spec §3 `ChatSession`).

use serde::{Deserialize, Serialize};

use crate::action::{Action, InterruptMode};

pub type ChatId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Routing,
    Executing,
    AwaitingApproval,
    Done,
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Idle
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    pub max_actions: u32,
    pub used_actions: u32,
    pub blocked_actions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interrupt {
    pub requested: bool,
    pub mode: InterruptMode,
    pub reason: String,
    pub ts: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMessage {
    pub ts: chrono::DateTime<chrono::Utc>,
    pub user_id: String,
    pub text: String,
    #[serde(default)]
    pub external_message_id: Option<String>,
}

/// A plan suffix parked waiting for operator approval (spec §3 `PendingApproval`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: String,
    pub chat_id: ChatId,
    pub job_id: String,
    pub action: Action,
    pub reason: String,
    pub blocked_index: usize,
    pub remaining_actions: Vec<Action>,
    /// Results accumulated before the block, serialized generically (the executor owns their
    /// concrete shape; the session store only needs to round-trip them).
    pub already_done: serde_json::Value,
    pub requested_by: String,
    pub ts: chrono::DateTime<chrono::Utc>,
}

pub const MAX_PENDING_MESSAGES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub chat_id: ChatId,
    pub job_id: Option<String>,
    pub state: RunState,
    pub budget: Budget,
    pub pending_approval: Option<PendingApproval>,
    pub last_route: Option<String>,
    pub pending_user_messages: Vec<PendingMessage>,
    pub interrupt: Option<Interrupt>,
    pub active_run_id: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ChatSession {
    pub fn new(chat_id: ChatId) -> Self {
        ChatSession {
            chat_id,
            job_id: None,
            state: RunState::Idle,
            budget: Budget::default(),
            pending_approval: None,
            last_route: None,
            pending_user_messages: Vec::new(),
            interrupt: None,
            active_run_id: None,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Appends a message, keeping only the most recent [`MAX_PENDING_MESSAGES`] (newest-last).
    pub fn push_pending_message(&mut self, message: PendingMessage) {
        self.pending_user_messages.push(message);
        let len = self.pending_user_messages.len();
        if len > MAX_PENDING_MESSAGES {
            self.pending_user_messages.drain(0..len - MAX_PENDING_MESSAGES);
        }
    }
}
