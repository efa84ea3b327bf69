//! # Executor (C7)
//!
//! Walks an [`crate::action::ActionPlan`] action by action: interrupt polling, allowlist and
//! budget gates, the approval gate, dispatch through [`ActionCallbacks`], and the selection-
//! update/interrupt short-circuits — exactly the eight steps spec'd for this component.

mod callbacks;
mod error;
mod run;
mod types;

pub use callbacks::{ActionCallbacks, ActionContext};
pub use error::ExecutorError;
pub use run::execute_plan;
pub use types::{ActionOutput, ActionResult, ExecutionOutcome, ResultStatus};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use crate::action::{
        Action, ActionPlan, ApprovalConfig, ContextScope, DraftProfile, FinalResponseStyle,
        InterruptMode, Risk, StatusDetail,
    };
    use crate::session::{Interrupt, SessionStore};

    use super::*;

    struct CountingCallbacks {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActionCallbacks for CountingCallbacks {
        async fn run_agent(
            &self,
            _ctx: &ActionContext,
            agent_id: &str,
            _goal: &str,
            _inputs: &Map<String, Value>,
        ) -> Result<ActionOutput, ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ActionOutput {
                agent_id: Some(agent_id.to_string()),
                provider: None,
                mode: "run".to_string(),
                text: "done".to_string(),
                extra: Value::Null,
            })
        }

        async fn propose_agent(&self, _: &ActionContext, _: &DraftProfile) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn need_more_detail(
            &self,
            _: &ActionContext,
            _: &str,
            _: &[String],
            _: u32,
            _: u32,
        ) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn open_context(&self, _: &ActionContext, _: ContextScope) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn summarize(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn search_public_agents(&self, _: &ActionContext, _: &str, _: u32) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn install_agent_blueprint(
            &self,
            _: &ActionContext,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn publish_agent(&self, _: &ActionContext, _: &str, _: &str) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn enable_agent(&self, _ctx: &ActionContext, agent_id: &str) -> Result<ActionOutput, ExecutorError> {
            Ok(ActionOutput {
                agent_id: Some(agent_id.to_string()),
                provider: None,
                mode: "enable_agent".to_string(),
                text: String::new(),
                extra: Value::Null,
            })
        }
        async fn disable_agent(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn enable_tool(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn disable_tool(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn list_agents(&self, _: &ActionContext, _: bool) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn list_tools(&self, _: &ActionContext, _: bool) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn create_agent(&self, _: &ActionContext, _: &DraftProfile, _: &str) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn update_agent(
            &self,
            _: &ActionContext,
            _: &str,
            _: &Map<String, Value>,
            _: &str,
        ) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn get_status(&self, _: &ActionContext, _: StatusDetail) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
        async fn interrupt(&self, _: &ActionContext, _: InterruptMode, _: &str) -> Result<ActionOutput, ExecutorError> {
            Ok(ActionOutput {
                agent_id: None,
                provider: None,
                mode: "interrupt".to_string(),
                text: String::new(),
                extra: Value::Null,
            })
        }
        async fn spawn_agents(&self, _: &ActionContext, _: &str, _: &[String], _: u32) -> Result<ActionOutput, ExecutorError> {
            unimplemented!()
        }
    }

    fn ctx() -> ActionContext {
        ActionContext {
            chat_id: "chat1".to_string(),
            user_id: "user1".to_string(),
            job_id: "job1".to_string(),
        }
    }

    fn run_agent(agent_id: &str) -> Action {
        Action::RunAgent {
            agent_id: agent_id.to_string(),
            goal: "go".to_string(),
            inputs: Default::default(),
            risk: Risk::L1,
        }
    }

    fn allow_all() -> HashSet<String> {
        crate::action::DEFAULT_ACTION_TAGS.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn dispatches_action_and_marks_done() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions
            .upsert("chat1", |s| s.budget.max_actions = 5)
            .await
            .unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("researcher")],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let outcome = execute_plan(
            &callbacks,
            ctx(),
            plan,
            &allow_all(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            false,
        )
        .await
        .unwrap();

        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(callbacks.calls.load(Ordering::SeqCst), 1);
        let session = sessions.get("chat1").await;
        assert_eq!(session.state, crate::session::RunState::Done);
        assert_eq!(session.budget.used_actions, 1);
    }

    #[tokio::test]
    async fn blocks_action_not_in_allowlist_without_consuming_budget() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("researcher")],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let outcome = execute_plan(
            &callbacks,
            ctx(),
            plan,
            &HashSet::new(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            false,
        )
        .await
        .unwrap();

        assert_eq!(outcome.results[0].status, super::ResultStatus::Blocked);
        assert_eq!(callbacks.calls.load(Ordering::SeqCst), 0);
        let session = sessions.get("chat1").await;
        assert_eq!(session.budget.used_actions, 0);
    }

    #[tokio::test]
    async fn budget_exhausted_blocks_and_records_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions
            .upsert("chat1", |s| {
                s.budget.max_actions = 1;
                s.budget.used_actions = 1;
            })
            .await
            .unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("researcher")],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let outcome = execute_plan(
            &callbacks,
            ctx(),
            plan,
            &allow_all(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            false,
        )
        .await
        .unwrap();

        assert_eq!(outcome.blocked_index, Some(0));
        assert_eq!(outcome.remaining_actions.len(), 1);
    }

    #[tokio::test]
    async fn approval_required_parks_pending_approval_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let high_risk_run = Action::RunAgent {
            agent_id: "coder".to_string(),
            goal: "write code".to_string(),
            inputs: Default::default(),
            risk: Risk::L3,
        };
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![high_risk_run],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let outcome = execute_plan(
            &callbacks,
            ctx(),
            plan,
            &allow_all(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            false,
        )
        .await
        .unwrap();

        assert!(outcome.pending_approval.is_some());
        assert_eq!(callbacks.calls.load(Ordering::SeqCst), 0);
        let session = sessions.get("chat1").await;
        assert_eq!(session.state, crate::session::RunState::AwaitingApproval);
    }

    #[tokio::test]
    async fn pre_approved_first_skips_the_approval_gate_on_resume() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let high_risk_run = Action::RunAgent {
            agent_id: "coder".to_string(),
            goal: "write code".to_string(),
            inputs: Default::default(),
            risk: Risk::L3,
        };
        let resume_plan = ActionPlan {
            reason: "resume".to_string(),
            actions: vec![high_risk_run, run_agent("researcher")],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let outcome = execute_plan(
            &callbacks,
            ctx(),
            resume_plan,
            &allow_all(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            true,
        )
        .await
        .unwrap();

        assert!(outcome.pending_approval.is_none());
        assert_eq!(callbacks.calls.load(Ordering::SeqCst), 2);
        let session = sessions.get("chat1").await;
        assert_eq!(session.state, crate::session::RunState::Done);
        assert_eq!(session.budget.used_actions, 2);
    }

    #[tokio::test]
    async fn cancel_interrupt_propagates_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions
            .upsert("chat1", |s| {
                s.budget.max_actions = 5;
                s.interrupt = Some(Interrupt {
                    requested: true,
                    mode: InterruptMode::Cancel,
                    reason: "user cancel".to_string(),
                    ts: chrono::Utc::now(),
                });
            })
            .await
            .unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![run_agent("researcher")],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let err = execute_plan(
            &callbacks,
            ctx(),
            plan,
            &allow_all(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            false,
        )
        .await
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn selection_update_short_circuits_remaining_actions() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("s.json")).await.unwrap();
        sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();
        let callbacks = CountingCallbacks { calls: AtomicUsize::new(0) };
        let plan = ActionPlan {
            reason: "r".to_string(),
            actions: vec![Action::EnableAgent { agent_id: "coder".to_string() }, run_agent("researcher")],
            final_response_style: FinalResponseStyle::Concise,
        };
        let resolver = |_: &str| None;
        let outcome = execute_plan(
            &callbacks,
            ctx(),
            plan,
            &allow_all(),
            &ApprovalConfig::default_policy(),
            &resolver,
            &sessions,
            false,
        )
        .await
        .unwrap();

        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(callbacks.calls.load(Ordering::SeqCst), 0);
    }
}
