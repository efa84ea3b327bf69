//! Idempotent thread/context-set provisioning and tracking-doc chaining against the knowledge
//! store (spec §4.4 `ensureJobThread`, `ensureServiceThread`, `appendTrackingChunkToGoc`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use goc_client::{KnowledgeStoreClient, NewResource, NEXT_PART};
use serde_json::Value;

use super::error::GocError;
use super::types::{load_mapping, save_mapping, GocMapping};

const SHARED_CONTEXT_SET: &str = "shared";
const JOB_CONFIG_RESOURCE_NAME: &str = "job_config";

/// Serializes concurrent callers that race to provision the same `(path, key)` thread, so two
/// tasks handling the same job never create two threads or two "shared" context sets.
pub struct GocCoordinator {
    client: Arc<KnowledgeStoreClient>,
    in_flight: Mutex<HashMap<(PathBuf, String), Arc<Mutex<()>>>>,
    job_thread_prefix: String,
    /// Tracking chunks for `progress.md` are not auto-activated by default — they accumulate
    /// fast and would otherwise dominate a compiled context.
    pub auto_activate_progress: bool,
    pub tracking_chunk_max_chars: usize,
}

impl GocCoordinator {
    pub fn new(client: Arc<KnowledgeStoreClient>) -> Self {
        GocCoordinator {
            client,
            in_flight: Mutex::new(HashMap::new()),
            job_thread_prefix: "job:".to_string(),
            auto_activate_progress: false,
            tracking_chunk_max_chars: 8000,
        }
    }

    async fn lock_for(&self, key: (PathBuf, String)) -> Arc<Mutex<()>> {
        let mut table = self.in_flight.lock().await;
        table.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Ensures `job_dir/goc.json` has a thread, a "shared" context set, and a default
    /// `job_config` resource, creating whichever are missing. Safe to call repeatedly; concurrent
    /// calls for the same `(job_dir, job_id)` are serialized so at most one of each is created.
    pub async fn ensure_job_thread(
        &self,
        job_dir: &Path,
        job_id: &str,
    ) -> Result<GocMapping, GocError> {
        let key = (job_dir.to_path_buf(), job_id.to_string());
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let goc_path = job_dir.join("goc.json");
        let mut mapping = load_mapping(&goc_path).await?;
        let title = format!("{}{job_id}", self.job_thread_prefix);
        self.ensure_thread_and_shared_set(&mut mapping, &[title.as_str()]).await?;
        self.ensure_job_config_resource(&mut mapping).await?;
        mapping.updated_at = chrono::Utc::now();
        save_mapping(&goc_path, &mapping).await?;
        Ok(mapping)
    }

    /// Ensures a workspace-scoped thread (the "agents" service thread, or a global thread)
    /// identified by the first matching title in `candidate_titles`, persisted at `map_path`.
    pub async fn ensure_service_thread(
        &self,
        map_path: &Path,
        candidate_titles: &[&str],
    ) -> Result<GocMapping, GocError> {
        let key = (map_path.to_path_buf(), candidate_titles.join("|"));
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;

        let mut mapping = load_mapping(map_path).await?;
        self.ensure_thread_and_shared_set(&mut mapping, candidate_titles).await?;
        mapping.updated_at = chrono::Utc::now();
        save_mapping(map_path, &mapping).await?;
        Ok(mapping)
    }

    async fn ensure_thread_and_shared_set(
        &self,
        mapping: &mut GocMapping,
        candidate_titles: &[&str],
    ) -> Result<(), GocError> {
        if mapping.thread_id.is_none() {
            let mut found = None;
            for title in candidate_titles {
                if let Some(thread) = self.client.find_thread_by_title(title).await? {
                    found = Some(thread.id);
                    break;
                }
            }
            let thread_id = match found {
                Some(id) => id,
                None => {
                    let title = candidate_titles.first().copied().unwrap_or("job:unknown");
                    self.client.create_thread(title).await?.id
                }
            };
            mapping.thread_id = Some(thread_id);
        }

        if mapping.shared_context_set_id.is_none() {
            let thread_id = mapping.thread_id.clone().expect("set above");
            let existing = self.client.list_context_sets(&thread_id).await?;
            let shared = existing.into_iter().find(|cs| cs.name == SHARED_CONTEXT_SET);
            let context_set_id = match shared {
                Some(cs) => cs.id,
                None => self.client.create_context_set(&thread_id, SHARED_CONTEXT_SET).await?.id,
            };
            mapping.shared_context_set_id = Some(context_set_id);
        }
        Ok(())
    }

    async fn ensure_job_config_resource(&self, mapping: &mut GocMapping) -> Result<(), GocError> {
        if mapping.last_node_by_doc.contains_key(JOB_CONFIG_RESOURCE_NAME) {
            return Ok(());
        }
        let context_set_id = mapping.shared_context_set_id.clone().expect("ensured above");
        let existing = self.client.list_resources(&context_set_id).await?;
        if let Some(found) = existing.into_iter().find(|r| r.name == JOB_CONFIG_RESOURCE_NAME) {
            mapping.last_node_by_doc.insert(JOB_CONFIG_RESOURCE_NAME.to_string(), found.id);
            return Ok(());
        }
        let created = self
            .client
            .create_resource(&NewResource {
                context_set_id,
                name: JOB_CONFIG_RESOURCE_NAME.to_string(),
                summary: "job configuration".to_string(),
                text_mode: "plain".to_string(),
                raw_text: String::new(),
                resource_kind: "job_config".to_string(),
                uri: None,
                auto_activate: true,
                attach_to: None,
                payload_json: Value::Null,
            })
            .await?;
        mapping.last_node_by_doc.insert(JOB_CONFIG_RESOURCE_NAME.to_string(), created.id);
        Ok(())
    }

    /// Appends one tracking chunk for `doc_name` (e.g. `plan.md`), chaining it to the previous
    /// chunk for that doc via a `NEXT_PART` edge, and persists the updated mapping.
    pub async fn append_tracking_chunk_to_goc(
        &self,
        job_dir: &Path,
        doc_name: &str,
        chunk: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), GocError> {
        let goc_path = job_dir.join("goc.json");
        let mut mapping = load_mapping(&goc_path).await?;
        let context_set_id = mapping
            .shared_context_set_id
            .clone()
            .ok_or_else(|| GocError::Store(goc_client::KnowledgeStoreError::Fatal {
                operation: "append_tracking_chunk_to_goc".to_string(),
                message: "job thread not provisioned".to_string(),
            }))?;

        let truncated = truncate_chars(chunk, self.tracking_chunk_max_chars);
        let previous = mapping.last_node_by_doc.get(doc_name).cloned();
        let auto_activate = doc_name != "progress.md" || self.auto_activate_progress;

        let created = self
            .client
            .create_resource(&NewResource {
                context_set_id,
                name: format!("{doc_name}@{}", at.to_rfc3339()),
                summary: truncated.clone(),
                text_mode: "plain".to_string(),
                raw_text: truncated,
                resource_kind: "tracking_chunk".to_string(),
                uri: None,
                auto_activate,
                attach_to: previous.clone(),
                payload_json: Value::Null,
            })
            .await?;

        if let Some(prev_id) = previous {
            self.client.create_edge(&prev_id, &created.id, NEXT_PART).await?;
        }

        mapping.last_node_by_doc.insert(doc_name.to_string(), created.id);
        mapping.updated_at = chrono::Utc::now();
        save_mapping(&goc_path, &mapping).await?;
        Ok(())
    }

    /// Fire-and-forget variant used by callers that must not fail on a knowledge-store outage —
    /// tracking continues to append to local files regardless.
    pub async fn append_hook(
        &self,
        job_dir: &Path,
        doc_name: &str,
        chunk: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) {
        if let Err(e) = self.append_tracking_chunk_to_goc(job_dir, doc_name, chunk, at).await {
            warn!(doc_name, error = %e, "goc tracking append failed, continuing without it");
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
