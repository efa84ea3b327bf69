//! # Session Store (C2)
//!
//! Per-chat mutable run state: active run, pending messages, pending approval, interrupt
//! request, budget counters — persisted to a single JSON file atomically.

mod error;
mod store;
mod types;

pub use error::SessionError;
pub use store::SessionStore;
pub use types::{
    Budget, ChatId, ChatSession, Interrupt, PendingApproval, PendingMessage, RunState,
    MAX_PENDING_MESSAGES,
};
