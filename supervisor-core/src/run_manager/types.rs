//! Inputs/outcomes for the per-chat drain loop (spec §4.8).

use crate::session::PendingMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Normal,
    InterruptUpdate,
}

/// One merged run invocation handed to the injected `runChat` callback.
#[derive(Debug, Clone)]
pub struct RunChatInput {
    pub chat_id: String,
    pub user_id: String,
    pub message: String,
    pub run_id: String,
    pub input_kind: InputKind,
    pub pending_count: usize,
    pub pending_rows: Vec<PendingMessage>,
    pub external_message_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleIncomingOutcome {
    /// Trimmed text was empty; nothing was queued.
    Ignored,
    /// A run was in flight; the message was merged into an interrupt-triggered replan.
    QueuedInterrupt,
    /// No run was in flight; a fresh drain loop iteration was started (or is already idle-armed).
    Started,
}
