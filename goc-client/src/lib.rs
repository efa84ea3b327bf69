//! # goc-client
//!
//! Thin, retry-capable HTTP client for the external knowledge-graph store: threads,
//! context-sets, resources (nodes), edges, compiled-context reads, and short-lived UI tokens.
//!
//! ## Design
//!
//! The store's API shape has drifted across deployments (different path conventions, response
//! wrapper keys). Rather than hardcode one shape, every logical operation in [`ops`] tries an
//! ordered list of [`client::Attempt`]s and stops at the first success or first non-retryable
//! status (see [`error::RETRYABLE_STATUSES`]). Response bodies are decoded defensively: lists
//! accept a bare array, `{items: [...]}`, `{data: [...]}`, or an operation-specific wrapper key.
//!
//! Compiled-context reads never return an HTML body as text — that shape means a misconfigured
//! base URL or a proxy intercepting the request, and is raised as
//! [`error::KnowledgeStoreError::HtmlBodyReturned`] instead.

mod client;
mod error;
mod model;
mod ops;

pub use client::KnowledgeStoreClient;
pub use error::{KnowledgeStoreError, RETRYABLE_STATUSES};
pub use model::{
    CompiledContext, CompiledContextExplain, ContextSet, Edge, NewResource, Resource, Thread,
    UiToken, NEXT_PART,
};
pub use ops::build_ui_link;
