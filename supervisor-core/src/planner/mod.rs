//! # Planner / Router (C6)
//!
//! Turns one user message plus a catalog/context bundle into a normalized [`ActionPlan`]: an
//! LLM-backed [`ChatProvider`] composes and answers a structured prompt, a tolerant extractor
//! pulls the JSON object out of its response, and post-processing enforces the provider/risk
//! rules. A deterministic keyword classifier stands in whenever the model path doesn't produce
//! a usable plan — this module works end-to-end with no live model at all.

mod error;
mod extract;
mod fallback;
mod postprocess;
mod prompt;
mod provider;
mod route;
mod types;

pub use error::PlannerError;
pub use fallback::mentioned_agent_ids;
pub use provider::{ChatProvider, ChatProviderError, MockChatProvider};
pub use route::route;
pub use types::RouterContext;
