//! Planner input/output types (spec §4.6).

use crate::registry::{AgentProfile, JobConfig, Tool};

/// Bundle of everything the planner needs beyond the raw user message.
#[derive(Debug, Clone)]
pub struct RouterContext {
    pub agents: Vec<AgentProfile>,
    pub tools: Vec<Tool>,
    pub job_config: JobConfig,
    pub current_job_id: Option<String>,
    pub current_context_set_id: Option<String>,
    pub locale: String,
    pub router_policy: String,
    pub context_summary: String,
}

impl RouterContext {
    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id.as_str()).collect()
    }
}
