//! Shared process state handed to the REPL loop (spec §4 component wiring, no chat transport).

use std::path::PathBuf;
use std::sync::Arc;

use goc_client::KnowledgeStoreClient;
use tokio::sync::RwLock;

use supervisor_core::action::ApprovalConfig;
use supervisor_core::goc::GocCoordinator;
use supervisor_core::registry::{AgentRegistry, AgentWriter, JobConfig};
use supervisor_core::session::SessionStore;

pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub registry: Arc<AgentRegistry>,
    pub writer: Arc<AgentWriter>,
    pub goc: Arc<GocCoordinator>,
    pub client: Arc<KnowledgeStoreClient>,
    pub job_config: Arc<RwLock<JobConfig>>,
    pub approval: ApprovalConfig,
    pub runs_dir: PathBuf,
    pub base_dir: PathBuf,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionStore>,
        registry: Arc<AgentRegistry>,
        writer: Arc<AgentWriter>,
        goc: Arc<GocCoordinator>,
        client: Arc<KnowledgeStoreClient>,
        runs_dir: PathBuf,
        base_dir: PathBuf,
    ) -> Self {
        AppState {
            sessions,
            registry,
            writer,
            goc,
            client,
            job_config: Arc::new(RwLock::new(JobConfig::default())),
            approval: ApprovalConfig::default_policy(),
            runs_dir,
            base_dir,
        }
    }
}
