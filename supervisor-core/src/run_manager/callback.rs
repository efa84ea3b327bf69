//! Collaborator seams the run manager calls out through: the planner+executor pipeline, and
//! the chat transport's outbound acknowledgement (spec §4.8). Modeled the same way the executor
//! models [`crate::executor::ActionCallbacks`] — an object-safe `async_trait` the caller
//! implements against its concrete transport/provider stack.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::RunManagerError;
use super::types::RunChatInput;

#[async_trait]
pub trait RunChatCallback: Send + Sync {
    /// Runs one planner → executor pass for `input`. Must honor `cancel`: once it fires, abort
    /// any in-flight provider call promptly and return `Err(RunManagerError::Cancelled)`.
    async fn run_chat(&self, input: RunChatInput, cancel: &CancellationToken) -> Result<(), RunManagerError>;
}

/// Outbound acknowledgement sink (e.g. the chat transport), used for debounced interrupt/cancel
/// acks and run-error notices.
#[async_trait]
pub trait AckSink: Send + Sync {
    async fn ack(&self, chat_id: &str, text: &str);
}
