//! Logical knowledge-store operations, grouped by the resource they act on.
//!
//! Each submodule adds methods to [`crate::client::KnowledgeStoreClient`] via `impl` blocks,
//! so callers only ever see one client type (`use goc_client::KnowledgeStoreClient`).

mod compiled_context;
mod resources;
mod threads;

pub use compiled_context::build_ui_link;
