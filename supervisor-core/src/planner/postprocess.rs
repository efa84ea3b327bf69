//! Post-processing rules applied to a freshly parsed plan before it is returned (spec §4.6):
//! drop planner-provider runs the user didn't ask for, force risk for file-writing runs, and
//! fall back to the deterministic classifier if nothing survives.

use crate::action::{Action, ActionPlan, Provider, Risk};
use crate::registry::AgentProfile;

use super::fallback::fallback_plan;
use super::types::RouterContext;

const EXPLICIT_PLANNER_KEYWORDS: &[&str] = &["use the planner", "use the router agent", "ask the planner"];

fn resolve_provider<'a>(agents: &'a [AgentProfile], agent_id: &str) -> Option<&'a str> {
    agents.iter().find(|a| a.id == agent_id).map(|a| a.provider.as_str())
}

pub fn postprocess(mut plan: ActionPlan, user_message: &str, ctx: &RouterContext) -> ActionPlan {
    let explicit_planner_request = {
        let lower = user_message.to_ascii_lowercase();
        EXPLICIT_PLANNER_KEYWORDS.iter().any(|kw| lower.contains(kw))
    };

    plan.actions.retain(|action| {
        if let Action::RunAgent { agent_id, .. } = action {
            if let Some(provider_key) = resolve_provider(&ctx.agents, agent_id) {
                let provider = crate::registry::provider_from_key(provider_key);
                if provider == Provider::Planner && !explicit_planner_request {
                    return false;
                }
            }
        }
        true
    });

    for action in &mut plan.actions {
        if let Action::RunAgent { agent_id, risk, .. } = action {
            if let Some(provider_key) = resolve_provider(&ctx.agents, agent_id) {
                if crate::registry::provider_from_key(provider_key) == Provider::Coder {
                    *risk = Risk::L3;
                }
            }
        }
    }

    if plan.actions.is_empty() {
        return fallback_plan(user_message, ctx);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionPlan, FinalResponseStyle};
    use crate::registry::JobConfig;

    fn ctx_with(agents: Vec<AgentProfile>) -> RouterContext {
        RouterContext {
            agents,
            tools: Vec::new(),
            job_config: JobConfig::default(),
            current_job_id: None,
            current_context_set_id: None,
            locale: "en".to_string(),
            router_policy: String::new(),
            context_summary: String::new(),
        }
    }

    fn run_agent(agent_id: &str, risk: Risk) -> Action {
        Action::RunAgent {
            agent_id: agent_id.to_string(),
            goal: "go".to_string(),
            inputs: Default::default(),
            risk,
        }
    }

    #[test]
    fn drops_planner_provider_run_without_explicit_request() {
        let ctx = ctx_with(vec![AgentProfile {
            id: "router".to_string(),
            provider: "planner".to_string(),
            ..Default::default()
        }]);
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("router", Risk::L1)],
            final_response_style: FinalResponseStyle::Concise,
        };
        let result = postprocess(plan, "please do something", &ctx);
        assert_eq!(result.reason, "fallback classifier: intent=run");
    }

    #[test]
    fn keeps_planner_provider_run_when_explicitly_requested() {
        let ctx = ctx_with(vec![AgentProfile {
            id: "router".to_string(),
            provider: "planner".to_string(),
            ..Default::default()
        }]);
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("router", Risk::L1)],
            final_response_style: FinalResponseStyle::Concise,
        };
        let result = postprocess(plan, "please use the planner directly", &ctx);
        assert_eq!(result.actions.len(), 1);
    }

    #[test]
    fn forces_l3_risk_for_coder_provider_run() {
        let ctx = ctx_with(vec![AgentProfile {
            id: "coder".to_string(),
            provider: "coder".to_string(),
            ..Default::default()
        }]);
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("coder", Risk::L1)],
            final_response_style: FinalResponseStyle::Concise,
        };
        let result = postprocess(plan, "write the patch", &ctx);
        match &result.actions[0] {
            Action::RunAgent { risk, .. } => assert_eq!(*risk, Risk::L3),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
