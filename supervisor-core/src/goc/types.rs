//! On-disk mapping from a job (or workspace-level service) to its knowledge-store thread,
//! context sets and per-doc tracking chain (spec §4.4 `GocMapping`).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::GocError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GocMapping {
    pub thread_id: Option<String>,
    pub shared_context_set_id: Option<String>,
    #[serde(default)]
    pub agent_context_set_ids: HashMap<String, String>,
    /// Last resource id appended for each tracking doc (`plan.md`, `research.md`, ...), used as
    /// the `attach_to` anchor and `NEXT_PART` edge source for the next chunk.
    #[serde(default)]
    pub last_node_by_doc: HashMap<String, String>,
    #[serde(default = "chrono::Utc::now")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl GocMapping {
    pub fn is_thread_ready(&self) -> bool {
        self.thread_id.is_some() && self.shared_context_set_id.is_some()
    }
}

pub(super) async fn load_mapping(path: &Path) -> Result<GocMapping, GocError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GocMapping::default()),
        Err(e) => Err(GocError::Read(e)),
    }
}

pub(super) async fn save_mapping(path: &Path, mapping: &GocMapping) -> Result<(), GocError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(GocError::Write)?;
    }
    let json = serde_json::to_string_pretty(mapping)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await.map_err(GocError::Write)?;
    tokio::fs::rename(&tmp, path).await.map_err(GocError::Write)?;
    Ok(())
}
