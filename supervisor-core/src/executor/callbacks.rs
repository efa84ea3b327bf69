//! Action dispatch seam: one callback method per [`Action`] variant (spec §4.7 step 5).
//! Implementations own the actual side effect (spawning an agent run, hitting the registry,
//! the knowledge store, ...); the executor only needs the envelope they return.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::action::{ContextScope, DraftProfile, InterruptMode, StatusDetail};

use super::error::ExecutorError;
use super::types::ActionOutput;

/// Identity shared by every callback invocation for one action.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub chat_id: String,
    pub user_id: String,
    pub job_id: String,
}

#[async_trait]
pub trait ActionCallbacks: Send + Sync {
    async fn run_agent(
        &self,
        ctx: &ActionContext,
        agent_id: &str,
        goal: &str,
        inputs: &Map<String, Value>,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn propose_agent(&self, ctx: &ActionContext, draft: &DraftProfile) -> Result<ActionOutput, ExecutorError>;

    async fn need_more_detail(
        &self,
        ctx: &ActionContext,
        context_set_id: &str,
        node_ids: &[String],
        depth: u32,
        max_chars: u32,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn open_context(&self, ctx: &ActionContext, scope: ContextScope) -> Result<ActionOutput, ExecutorError>;

    async fn summarize(&self, ctx: &ActionContext, hint: &str) -> Result<ActionOutput, ExecutorError>;

    async fn search_public_agents(
        &self,
        ctx: &ActionContext,
        query: &str,
        limit: u32,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn install_agent_blueprint(
        &self,
        ctx: &ActionContext,
        blueprint_id: &str,
        public_node_id: &str,
        agent_id_override: Option<&str>,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn publish_agent(
        &self,
        ctx: &ActionContext,
        agent_node_id: &str,
        agent_id: &str,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn enable_agent(&self, ctx: &ActionContext, agent_id: &str) -> Result<ActionOutput, ExecutorError>;
    async fn disable_agent(&self, ctx: &ActionContext, agent_id: &str) -> Result<ActionOutput, ExecutorError>;
    async fn enable_tool(&self, ctx: &ActionContext, tool_id: &str) -> Result<ActionOutput, ExecutorError>;
    async fn disable_tool(&self, ctx: &ActionContext, tool_id: &str) -> Result<ActionOutput, ExecutorError>;

    async fn list_agents(&self, ctx: &ActionContext, include_disabled: bool) -> Result<ActionOutput, ExecutorError>;
    async fn list_tools(&self, ctx: &ActionContext, include_disabled: bool) -> Result<ActionOutput, ExecutorError>;

    async fn create_agent(
        &self,
        ctx: &ActionContext,
        profile: &DraftProfile,
        format: &str,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn update_agent(
        &self,
        ctx: &ActionContext,
        agent_id: &str,
        patch: &Map<String, Value>,
        format: &str,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn get_status(&self, ctx: &ActionContext, detail: StatusDetail) -> Result<ActionOutput, ExecutorError>;

    async fn interrupt(
        &self,
        ctx: &ActionContext,
        mode: InterruptMode,
        note: &str,
    ) -> Result<ActionOutput, ExecutorError>;

    async fn spawn_agents(
        &self,
        ctx: &ActionContext,
        summary: &str,
        agents: &[String],
        max_parallel: u32,
    ) -> Result<ActionOutput, ExecutorError>;
}
