//! [`ActionCallbacks`] over spawned provider CLI child processes and the agent registry, for
//! driving a chat loop straight from a terminal (spec §4.7 step 5, `supervisor-cli`'s operator
//! console). Mirrors `telegram-bot`'s callback implementation; duplicated rather than shared
//! since the two are separate binaries with no common lib target.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::RwLock;

use supervisor_core::action::{ContextScope, DraftProfile, InterruptMode, Provider, StatusDetail};
use supervisor_core::executor::{ActionCallbacks, ActionContext, ActionOutput, ExecutorError};
use supervisor_core::goc::GocCoordinator;
use supervisor_core::registry::{provider_from_key, AgentRegistry, AgentWriter, JobConfig};
use supervisor_core::session::SessionStore;

const PLANNER_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const CODER_TIMEOUT: Duration = Duration::from_secs(45 * 60);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const AGENTS_THREAD_TITLES: &[&str] = &["agents", "service:agents"];

/// One shell command per [`Provider`] kind, read once from `PROVIDER_CMD_<KIND>` env vars.
pub struct ProviderCommands {
    planner: Option<String>,
    coder: Option<String>,
    researcher: Option<String>,
    other: Option<String>,
}

impl ProviderCommands {
    pub fn from_env() -> Self {
        ProviderCommands {
            planner: std::env::var("PROVIDER_CMD_PLANNER").ok(),
            coder: std::env::var("PROVIDER_CMD_CODER").ok(),
            researcher: std::env::var("PROVIDER_CMD_RESEARCHER").ok(),
            other: std::env::var("PROVIDER_CMD_OTHER").ok(),
        }
    }

    fn command_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Planner => self.planner.as_deref(),
            Provider::Coder => self.coder.as_deref(),
            Provider::Researcher => self.researcher.as_deref(),
            Provider::Other => self.other.as_deref(),
        }
    }
}

pub struct CliActionCallbacks {
    registry: Arc<AgentRegistry>,
    writer: Arc<AgentWriter>,
    goc: Arc<GocCoordinator>,
    sessions: Arc<SessionStore>,
    job_config: Arc<RwLock<JobConfig>>,
    commands: ProviderCommands,
    base_dir: PathBuf,
}

impl CliActionCallbacks {
    pub fn new(
        registry: Arc<AgentRegistry>,
        writer: Arc<AgentWriter>,
        goc: Arc<GocCoordinator>,
        sessions: Arc<SessionStore>,
        job_config: Arc<RwLock<JobConfig>>,
        base_dir: PathBuf,
    ) -> Self {
        CliActionCallbacks {
            registry,
            writer,
            goc,
            sessions,
            job_config,
            commands: ProviderCommands::from_env(),
            base_dir,
        }
    }

    async fn agents_context_set_id(&self) -> Result<String, ExecutorError> {
        let map_path = self.base_dir.join("goc.service.json");
        let mapping = self
            .goc
            .ensure_service_thread(&map_path, AGENTS_THREAD_TITLES)
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        mapping
            .shared_context_set_id
            .ok_or_else(|| ExecutorError::Callback("agents thread has no shared context set".to_string()))
    }

    async fn spawn_provider(&self, provider: Provider, goal: &str, inputs: &Value) -> Result<String, ExecutorError> {
        let cmd = self
            .commands
            .command_for(provider)
            .ok_or_else(|| ExecutorError::Callback(format!("no provider command configured for {provider:?}")))?;

        let mut parts = cmd.split_whitespace();
        let program = parts.next().ok_or_else(|| ExecutorError::Callback("empty provider command".to_string()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::Callback(format!("spawn {program}: {e}")))?;

        let payload = json!({ "goal": goal, "inputs": inputs }).to_string();
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(payload.as_bytes()).await;
            let _ = stdin.write_all(b"\n").await;
        }

        let timeout = match provider {
            Provider::Planner => PLANNER_TIMEOUT,
            Provider::Coder => CODER_TIMEOUT,
            _ => DEFAULT_TIMEOUT,
        };

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecutorError::Callback(format!("{program} timed out after {timeout:?}")))?
            .map_err(|e| ExecutorError::Callback(format!("{program} exited with error: {e}")))?;

        if !output.status.success() {
            return Err(ExecutorError::Callback(format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn output(agent_id: Option<&str>, provider: Option<&str>, mode: &str, text: String) -> ActionOutput {
    ActionOutput {
        agent_id: agent_id.map(str::to_string),
        provider: provider.map(str::to_string),
        mode: mode.to_string(),
        text,
        extra: Value::Null,
    }
}

#[async_trait]
impl ActionCallbacks for CliActionCallbacks {
    async fn run_agent(
        &self,
        ctx: &ActionContext,
        agent_id: &str,
        goal: &str,
        inputs: &Map<String, Value>,
    ) -> Result<ActionOutput, ExecutorError> {
        let catalog = self
            .registry
            .load_agents_from_goc(&self.base_dir, false)
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        let profile = catalog
            .by_id
            .get(agent_id)
            .ok_or_else(|| ExecutorError::Callback(format!("unknown agent id {agent_id:?}")))?;

        let provider = provider_from_key(&profile.provider);
        let reply = self.spawn_provider(provider, goal, &Value::Object(inputs.clone())).await?;

        Ok(output(Some(agent_id), Some(&profile.provider), "run", reply))
    }

    async fn propose_agent(&self, _ctx: &ActionContext, draft: &DraftProfile) -> Result<ActionOutput, ExecutorError> {
        let text = format!(
            "proposed agent {:?}: provider={:?} system_prompt={:?}",
            draft.id, draft.provider, draft.system_prompt
        );
        Ok(output(None, None, "propose_agent", text))
    }

    async fn need_more_detail(
        &self,
        _ctx: &ActionContext,
        context_set_id: &str,
        node_ids: &[String],
        depth: u32,
        max_chars: u32,
    ) -> Result<ActionOutput, ExecutorError> {
        Ok(output(
            None,
            None,
            "need_more_detail",
            format!("requested {} node(s) from {context_set_id} at depth {depth}, max {max_chars} chars", node_ids.len()),
        ))
    }

    async fn open_context(&self, _ctx: &ActionContext, scope: ContextScope) -> Result<ActionOutput, ExecutorError> {
        Ok(output(None, None, "open_context", format!("opened {scope:?} context")))
    }

    async fn summarize(&self, _ctx: &ActionContext, hint: &str) -> Result<ActionOutput, ExecutorError> {
        Ok(output(None, None, "summarize", format!("summary hint: {hint}")))
    }

    async fn search_public_agents(
        &self,
        _ctx: &ActionContext,
        query: &str,
        limit: u32,
    ) -> Result<ActionOutput, ExecutorError> {
        Ok(output(None, None, "search_public_agents", format!("searched public library for {query:?} (limit {limit})")))
    }

    async fn install_agent_blueprint(
        &self,
        _ctx: &ActionContext,
        blueprint_id: &str,
        public_node_id: &str,
        agent_id_override: Option<&str>,
    ) -> Result<ActionOutput, ExecutorError> {
        let context_set_id = self.agents_context_set_id().await?;
        let profile = self
            .writer
            .install_from_public_library(&context_set_id, public_node_id, agent_id_override, None)
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        Ok(output(Some(&profile.id), None, "install_agent_blueprint", format!("installed {blueprint_id} as {}", profile.id)))
    }

    async fn publish_agent(&self, _ctx: &ActionContext, agent_node_id: &str, agent_id: &str) -> Result<ActionOutput, ExecutorError> {
        Ok(output(
            Some(agent_id),
            None,
            "publish_agent",
            format!("published {agent_id} (node {agent_node_id}) to the public library"),
        ))
    }

    async fn enable_agent(&self, _ctx: &ActionContext, agent_id: &str) -> Result<ActionOutput, ExecutorError> {
        let mut cfg = self.job_config.write().await;
        if !cfg.enabled_agent_ids.iter().any(|id| id == agent_id) {
            cfg.enabled_agent_ids.push(agent_id.to_string());
        }
        Ok(output(Some(agent_id), None, "enable_agent", format!("enabled {agent_id}")))
    }

    async fn disable_agent(&self, _ctx: &ActionContext, agent_id: &str) -> Result<ActionOutput, ExecutorError> {
        let mut cfg = self.job_config.write().await;
        cfg.enabled_agent_ids.retain(|id| id != agent_id);
        Ok(output(Some(agent_id), None, "disable_agent", format!("disabled {agent_id}")))
    }

    async fn enable_tool(&self, _ctx: &ActionContext, tool_id: &str) -> Result<ActionOutput, ExecutorError> {
        let mut cfg = self.job_config.write().await;
        if !cfg.enabled_tool_names.iter().any(|id| id == tool_id) {
            cfg.enabled_tool_names.push(tool_id.to_string());
        }
        Ok(output(None, None, "enable_tool", format!("enabled tool {tool_id}")))
    }

    async fn disable_tool(&self, _ctx: &ActionContext, tool_id: &str) -> Result<ActionOutput, ExecutorError> {
        let mut cfg = self.job_config.write().await;
        cfg.enabled_tool_names.retain(|id| id != tool_id);
        Ok(output(None, None, "disable_tool", format!("disabled tool {tool_id}")))
    }

    async fn list_agents(&self, _ctx: &ActionContext, include_disabled: bool) -> Result<ActionOutput, ExecutorError> {
        let catalog = self
            .registry
            .load_agents_from_goc(&self.base_dir, false)
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        let cfg = self.job_config.read().await;
        let lines: Vec<String> = catalog
            .agents
            .iter()
            .filter(|a| include_disabled || cfg.enabled_agent_ids.is_empty() || cfg.enabled_agent_ids.contains(&a.id))
            .map(|a| format!("{} ({}) - {}", a.id, a.provider, a.description))
            .collect();
        Ok(output(None, None, "list_agents", lines.join("\n")))
    }

    async fn list_tools(&self, _ctx: &ActionContext, _include_disabled: bool) -> Result<ActionOutput, ExecutorError> {
        let cfg = self.job_config.read().await;
        Ok(output(None, None, "list_tools", cfg.enabled_tool_names.join("\n")))
    }

    async fn create_agent(&self, _ctx: &ActionContext, profile: &DraftProfile, _format: &str) -> Result<ActionOutput, ExecutorError> {
        let context_set_id = self.agents_context_set_id().await?;
        let new_profile = supervisor_core::registry::AgentProfile {
            id: profile.id.clone().unwrap_or_default(),
            name: profile.name.clone().unwrap_or_default(),
            description: profile.description.clone().unwrap_or_default(),
            provider: profile.provider.clone().unwrap_or_default(),
            model: profile.model.clone().unwrap_or_default(),
            system_prompt: profile.system_prompt.clone().unwrap_or_default(),
            tools: Vec::new(),
            enabled: true,
            origin: None,
            metadata: profile.metadata.clone().into_iter().collect(),
        };
        let created = self
            .writer
            .upsert_agent_profile(&context_set_id, new_profile, None, "create")
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        Ok(output(Some(&created.id), None, "create_agent", format!("created agent {}", created.id)))
    }

    async fn update_agent(
        &self,
        _ctx: &ActionContext,
        agent_id: &str,
        patch: &Map<String, Value>,
        _format: &str,
    ) -> Result<ActionOutput, ExecutorError> {
        let context_set_id = self.agents_context_set_id().await?;
        let catalog = self
            .registry
            .load_agents_from_goc(&self.base_dir, false)
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        let mut profile = catalog
            .by_id
            .get(agent_id)
            .cloned()
            .ok_or_else(|| ExecutorError::Callback(format!("unknown agent id {agent_id:?}")))?;
        apply_patch(&mut profile, patch);
        let updated = self
            .writer
            .upsert_agent_profile(&context_set_id, profile, None, "update")
            .await
            .map_err(|e| ExecutorError::Callback(e.to_string()))?;
        Ok(output(Some(&updated.id), None, "update_agent", format!("updated agent {}", updated.id)))
    }

    async fn get_status(&self, ctx: &ActionContext, detail: StatusDetail) -> Result<ActionOutput, ExecutorError> {
        let session = self.sessions.get(&ctx.chat_id).await;
        let text = match detail {
            StatusDetail::Summary => format!("state={:?} job={:?}", session.state, session.job_id),
            StatusDetail::Full => format!(
                "state={:?} job={:?} used_actions={} pending_messages={} pending_approval={}",
                session.state,
                session.job_id,
                session.budget.used_actions,
                session.pending_user_messages.len(),
                session.pending_approval.is_some()
            ),
        };
        Ok(output(None, None, "get_status", text))
    }

    async fn interrupt(&self, ctx: &ActionContext, mode: InterruptMode, note: &str) -> Result<ActionOutput, ExecutorError> {
        self.sessions
            .upsert(&ctx.chat_id, |s| {
                s.interrupt = Some(supervisor_core::session::Interrupt {
                    requested: true,
                    mode,
                    reason: note.to_string(),
                    ts: chrono::Utc::now(),
                });
            })
            .await
            .map_err(ExecutorError::Session)?;
        Ok(output(None, None, "interrupt", format!("{mode:?}: {note}")))
    }

    async fn spawn_agents(
        &self,
        ctx: &ActionContext,
        summary: &str,
        agents: &[String],
        max_parallel: u32,
    ) -> Result<ActionOutput, ExecutorError> {
        // Sequential rather than chunked/concurrent: an operator driving one terminal at a time
        // has no need for the telegram-bot side's `max_parallel` fan-out.
        let _ = max_parallel;
        let mut replies = Vec::with_capacity(agents.len());
        for agent_id in agents {
            match self.run_agent(ctx, agent_id, summary, &Map::new()).await {
                Ok(out) => replies.push(format!("{agent_id}: {}", out.text)),
                Err(e) => replies.push(format!("{agent_id}: error: {e}")),
            }
        }
        Ok(output(None, None, "spawn_agents", replies.join("\n")))
    }
}

fn apply_patch(profile: &mut supervisor_core::registry::AgentProfile, patch: &Map<String, Value>) {
    if let Some(Value::String(s)) = patch.get("name") {
        profile.name = s.clone();
    }
    if let Some(Value::String(s)) = patch.get("description") {
        profile.description = s.clone();
    }
    if let Some(Value::String(s)) = patch.get("system_prompt") {
        profile.system_prompt = s.clone();
    }
    if let Some(Value::String(s)) = patch.get("model") {
        profile.model = s.clone();
    }
    if let Some(Value::Bool(b)) = patch.get("enabled") {
        profile.enabled = *b;
    }
}
