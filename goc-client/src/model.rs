//! Wire-adjacent types for the knowledge-graph store.
//!
//! These mirror spec §6's contract (not a single URL shape): fields are the union of what the
//! store's resource/edge/thread records carry, deserialized defensively — unknown extra fields
//! are ignored, and most fields fall back to sane defaults when the server omits them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSet {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub name: String,
}

/// One append-only document node ("resource").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub resource_kind: String,
    #[serde(default)]
    pub uri: Option<String>,
    pub context_set_id: String,
    #[serde(default)]
    pub auto_activate: bool,
    #[serde(default)]
    pub attach_to: Option<String>,
    #[serde(default)]
    pub payload_json: Value,
}

/// Fields accepted when creating a resource; `id` is assigned by the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewResource {
    pub name: String,
    pub summary: String,
    pub text_mode: String,
    pub raw_text: String,
    pub resource_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub context_set_id: String,
    pub auto_activate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach_to: Option<String>,
    pub payload_json: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

pub const NEXT_PART: &str = "NEXT_PART";

/// Plain compiled text, or the richer explain payload when requested.
#[derive(Debug, Clone)]
pub struct CompiledContext {
    pub compiled_text: String,
}

#[derive(Debug, Clone)]
pub struct CompiledContextExplain {
    pub compiled_text: String,
    pub explain: Value,
    pub active_node_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiToken {
    pub token: String,
    pub exp: i64,
}
