//! Shared process state handed to every handler (spec §4 component wiring).

use std::path::PathBuf;
use std::sync::Arc;

use goc_client::KnowledgeStoreClient;
use teloxide::prelude::*;
use tokio::sync::RwLock;

use supervisor_core::action::ApprovalConfig;
use supervisor_core::goc::GocCoordinator;
use supervisor_core::registry::{AgentRegistry, AgentWriter, JobConfig};
use supervisor_core::session::SessionStore;

pub struct AppState {
    pub bot: Bot,
    pub sessions: Arc<SessionStore>,
    pub registry: Arc<AgentRegistry>,
    pub writer: Arc<AgentWriter>,
    pub goc: Arc<GocCoordinator>,
    pub client: Arc<KnowledgeStoreClient>,
    /// Process-local selection state for `enable_agent`/`disable_agent`/`enable_tool`/
    /// `disable_tool` (spec §4.5 has no persisted per-job `JobConfig` write path yet).
    pub job_config: Arc<RwLock<JobConfig>>,
    pub approval: ApprovalConfig,
    pub runs_dir: PathBuf,
    pub base_dir: PathBuf,
}

impl AppState {
    pub fn new(
        bot: Bot,
        sessions: Arc<SessionStore>,
        registry: Arc<AgentRegistry>,
        writer: Arc<AgentWriter>,
        goc: Arc<GocCoordinator>,
        client: Arc<KnowledgeStoreClient>,
        runs_dir: PathBuf,
        base_dir: PathBuf,
    ) -> Self {
        AppState {
            bot,
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
