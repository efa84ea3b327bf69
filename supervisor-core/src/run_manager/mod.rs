//! # Run Manager (C8)
//!
//! One drain-loop task per chat, spawned lazily and tracked by chat id. A message arriving
//! while a run is in flight preempts it (cancel + replan) rather than queuing behind it; one
//! arriving while idle starts a fresh drain iteration. At most one run per chat executes at a
//! time; interrupt acks are rate-limited per chat.
//!
//! | Item | Role |
//! |------|------|
//! | [`RunManager`] | Owns the per-chat handles and drives `handle_incoming`/`hard_cancel`. |
//! | [`RunChatCallback`] | Injected planner→executor pass for one merged message. |
//! | [`AckSink`] | Injected outbound acknowledgement (debounced). |

mod callback;
mod error;
mod manager;
mod types;

pub use callback::{AckSink, RunChatCallback};
pub use error::RunManagerError;
pub use manager::RunManager;
pub use types::{HandleIncomingOutcome, InputKind, RunChatInput};
