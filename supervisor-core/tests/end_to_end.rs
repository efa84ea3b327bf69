//! Top-level integration tests wiring `run_manager` -> `planner` -> `executor` together for one
//! merged chat message, as opposed to the colocated unit tests in each module which exercise a
//! single component in isolation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex as TokioMutex;
use tokio_util::sync::CancellationToken;

use supervisor_core::action::{
    effective_allowlist, Action, ActionPlan, ApprovalConfig, ContextScope, DraftProfile,
    FinalResponseStyle, InterruptMode, Risk, StatusDetail,
};
use supervisor_core::executor::{execute_plan, ActionCallbacks, ActionContext, ActionOutput, ExecutorError};
use supervisor_core::planner::{route, ChatProvider, MockChatProvider, RouterContext};
use supervisor_core::registry::{AgentProfile, JobConfig};
use supervisor_core::run_manager::{AckSink, HandleIncomingOutcome, RunChatCallback, RunChatInput, RunManager, RunManagerError};
use supervisor_core::session::{Interrupt, RunState, SessionStore};

fn agent(id: &str, provider: &str) -> AgentProfile {
    AgentProfile { id: id.to_string(), provider: provider.to_string(), enabled: true, ..Default::default() }
}

fn allow_all() -> HashSet<String> {
    effective_allowlist(&HashSet::new(), &[])
}

fn router_ctx(agents: Vec<AgentProfile>) -> RouterContext {
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

/// Records every `run_agent` call (and, optionally, injects a mid-run cancel after the first
/// one) so tests can assert dispatch order without a real provider CLI behind it.
struct RecordingCallbacks {
    sessions: Arc<SessionStore>,
    chat_id: String,
    run_agent_calls: TokioMutex<Vec<String>>,
    cancel_after_first: bool,
    run_delay: Duration,
}

impl RecordingCallbacks {
    fn new(sessions: Arc<SessionStore>, chat_id: &str) -> Self {
        RecordingCallbacks {
            sessions,
            chat_id: chat_id.to_string(),
            run_agent_calls: TokioMutex::new(Vec::new()),
            cancel_after_first: false,
            run_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ActionCallbacks for RecordingCallbacks {
    async fn run_agent(&self, _ctx: &ActionContext, agent_id: &str, _goal: &str, _inputs: &Map<String, Value>) -> Result<ActionOutput, ExecutorError> {
        if self.run_delay > Duration::ZERO {
            tokio::time::sleep(self.run_delay).await;
        }
        let mut calls = self.run_agent_calls.lock().await;
        calls.push(agent_id.to_string());
        let count = calls.len();
        drop(calls);
        if self.cancel_after_first && count == 1 {
            self.sessions
                .upsert(&self.chat_id, |s| {
                    s.interrupt = Some(Interrupt {
                        requested: true,
                        mode: InterruptMode::Cancel,
                        reason: "user_cancel".to_string(),
                        ts: chrono::Utc::now(),
                    });
                })
                .await
                .unwrap();
        }
        Ok(ActionOutput { agent_id: Some(agent_id.to_string()), provider: None, mode: "run".to_string(), text: "done".to_string(), extra: Value::Null })
    }

    async fn propose_agent(&self, _: &ActionContext, _: &DraftProfile) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn need_more_detail(&self, _: &ActionContext, _: &str, _: &[String], _: u32, _: u32) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn open_context(&self, _: &ActionContext, _: ContextScope) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn summarize(&self, _ctx: &ActionContext, hint: &str) -> Result<ActionOutput, ExecutorError> {
        Ok(ActionOutput { agent_id: None, provider: None, mode: "summarize".to_string(), text: hint.to_string(), extra: Value::Null })
    }
    async fn search_public_agents(&self, _: &ActionContext, _: &str, _: u32) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn install_agent_blueprint(&self, _: &ActionContext, _: &str, _: &str, _: Option<&str>) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn publish_agent(&self, _: &ActionContext, _: &str, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn enable_agent(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn disable_agent(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn enable_tool(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn disable_tool(&self, _: &ActionContext, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn list_agents(&self, _: &ActionContext, _: bool) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn list_tools(&self, _: &ActionContext, _: bool) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn create_agent(&self, _: &ActionContext, _: &DraftProfile, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn update_agent(&self, _: &ActionContext, _: &str, _: &Map<String, Value>, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn get_status(&self, _: &ActionContext, _: StatusDetail) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn interrupt(&self, _: &ActionContext, _: InterruptMode, _: &str) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
    async fn spawn_agents(&self, _: &ActionContext, _: &str, _: &[String], _: u32) -> Result<ActionOutput, ExecutorError> { unimplemented!() }
}

/// `RunChatCallback` that genuinely chains `route()` into `execute_plan()`, the way
/// `CliRunChat`/`SupervisorRunChat` do against a live chat transport, minus the transport.
struct FullStackRunChat {
    sessions: Arc<SessionStore>,
    provider: Box<dyn ChatProvider>,
    callbacks: Arc<RecordingCallbacks>,
    approval: ApprovalConfig,
    allowlist: HashSet<String>,
    agents: Vec<AgentProfile>,
}

#[async_trait]
impl RunChatCallback for FullStackRunChat {
    async fn run_chat(&self, input: RunChatInput, cancel: &CancellationToken) -> Result<(), RunManagerError> {
        let ctx = router_ctx(self.agents.clone());
        let plan = route(self.provider.as_ref(), &input.message, &ctx, cancel)
            .await
            .map_err(|e| if e.is_cancelled() { RunManagerError::Cancelled } else { RunManagerError::RunFailed(e.to_string()) })?;

        let action_ctx = ActionContext { chat_id: input.chat_id.clone(), user_id: input.user_id.clone(), job_id: "job1".to_string() };
        let resolver = |_: &str| None;
        execute_plan(self.callbacks.as_ref(), action_ctx, plan, &self.allowlist, &self.approval, &resolver, &self.sessions, false)
            .await
            .map(|_| ())
            .map_err(|e| if e.is_cancelled() { RunManagerError::Cancelled } else { RunManagerError::RunFailed(e.to_string()) })
    }
}

/// A [`ChatProvider`] that sleeps on its first call (so an in-flight `route()` can be preempted
/// via its `CancellationToken`) and fails immediately after, so a retried/merged call falls
/// through to the deterministic classifier right away.
struct FlakyFirstCallProvider {
    calls: std::sync::atomic::AtomicUsize,
    first_call_delay: Duration,
}

#[async_trait]
impl ChatProvider for FlakyFirstCallProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, supervisor_core::planner::ChatProviderError> {
        let call_index = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if call_index == 0 {
            tokio::time::sleep(self.first_call_delay).await;
        }
        Err(supervisor_core::planner::ChatProviderError::Failed("planner unreachable".to_string()))
    }
}

struct NoopAck;

#[async_trait]
impl AckSink for NoopAck {
    async fn ack(&self, _chat_id: &str, _text: &str) {}
}

async fn wait_for_state(sessions: &SessionStore, chat_id: &str, state: RunState) {
    for _ in 0..300 {
        if sessions.get(chat_id).await.state == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session for {chat_id} never reached {state:?}");
}

/// Scenario: simple run. An unreachable planner LLM falls back to the deterministic classifier,
/// which (given no `@agent`/`id:` mention) targets the first catalog agent; the executor
/// dispatches it and the session settles `done` with one used action.
#[tokio::test]
async fn simple_run_falls_back_and_dispatches_first_catalog_agent() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
    sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();

    let callbacks = Arc::new(RecordingCallbacks::new(sessions.clone(), "chat1"));
    let run_chat = Arc::new(FullStackRunChat {
        sessions: sessions.clone(),
        provider: Box::new(MockChatProvider::err("planner unreachable")),
        callbacks: callbacks.clone(),
        approval: ApprovalConfig::default_policy(),
        allowlist: allow_all(),
        agents: vec![agent("router", "router"), agent("coder", "coder"), agent("researcher", "researcher")],
    });
    let manager = RunManager::with_timing(sessions.clone(), run_chat, Arc::new(NoopAck), Duration::ZERO, Duration::from_millis(50));

    let outcome = manager.handle_incoming("chat1", "u1", "please summarize the current plan").await.unwrap();
    assert_eq!(outcome, HandleIncomingOutcome::Started);

    wait_for_state(&sessions, "chat1", RunState::Done).await;
    assert_eq!(*callbacks.run_agent_calls.lock().await, vec!["router".to_string()]);
    let session = sessions.get("chat1").await;
    assert_eq!(session.budget.used_actions, 1);
}

/// Scenario: preempt + merge. A second message arriving while the first run is in flight
/// preempts it rather than queuing behind it; both end up folded into one subsequent
/// `runChat` call (the most recent message leading, the earlier one appended as additional
/// instructions), so exactly one agent run actually executes for the pair.
#[tokio::test]
async fn preempt_merges_second_message_into_one_dispatched_run() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
    sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();

    let callbacks = Arc::new(RecordingCallbacks::new(sessions.clone(), "chat1"));
    let provider = FlakyFirstCallProvider { calls: std::sync::atomic::AtomicUsize::new(0), first_call_delay: Duration::from_millis(300) };
    let run_chat = Arc::new(FullStackRunChat {
        sessions: sessions.clone(),
        provider: Box::new(provider),
        callbacks: callbacks.clone(),
        approval: ApprovalConfig::default_policy(),
        allowlist: allow_all(),
        agents: vec![agent("router", "router")],
    });
    let manager = RunManager::with_timing(sessions.clone(), run_chat, Arc::new(NoopAck), Duration::ZERO, Duration::from_millis(50));

    manager.handle_incoming("chat1", "u1", "please run task A").await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    let outcome = manager.handle_incoming("chat1", "u1", "please run task B").await.unwrap();
    assert_eq!(outcome, HandleIncomingOutcome::QueuedInterrupt);

    wait_for_state(&sessions, "chat1", RunState::Idle).await;
    // Both merged into a single drain iteration: one dispatched run_agent call total.
    assert_eq!(callbacks.run_agent_calls.lock().await.len(), 1);
}

/// Scenario: approval gate on code write. `require_file_write` is set and the plan's first
/// action targets the coder provider; the executor parks pending approval before dispatching
/// anything, leaving the whole plan (including the trailing `summarize`) in `remaining_actions`.
#[tokio::test]
async fn approval_gate_blocks_code_write_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
    sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();
    let callbacks = Arc::new(RecordingCallbacks::new(sessions.clone(), "chat1"));

    let plan = ActionPlan {
        reason: "write the fix".to_string(),
        actions: vec![
            Action::RunAgent { agent_id: "coder".to_string(), goal: "write the fix".to_string(), inputs: Default::default(), risk: Risk::L1 },
            Action::Summarize { hint: "summarize the change".to_string(), risk: Risk::L0 },
        ],
        final_response_style: FinalResponseStyle::Concise,
    };
    let approval = ApprovalConfig { require_for_risk: [Risk::L3].into_iter().collect(), require_file_write: true };
    let resolver = |id: &str| (id == "coder").then_some(supervisor_core::action::Provider::Coder);
    let ctx = ActionContext { chat_id: "chat1".to_string(), user_id: "u1".to_string(), job_id: "job1".to_string() };

    let outcome = execute_plan(callbacks.as_ref(), ctx, plan, &allow_all(), &approval, &resolver, &sessions, false)
        .await
        .unwrap();

    let pending = outcome.pending_approval.expect("expected a parked approval");
    assert!(pending.reason.contains("file-write"));
    assert_eq!(outcome.remaining_actions.len(), 2);
    assert!(callbacks.run_agent_calls.lock().await.is_empty());
    let session = sessions.get("chat1").await;
    assert_eq!(session.state, RunState::AwaitingApproval);
}

/// Scenario: budget cap. `max_actions=2` against a four-action plan; the first two dispatch,
/// the third is blocked for budget and the walk stops there (the fourth is never even attempted).
#[tokio::test]
async fn budget_cap_blocks_remaining_actions_once_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
    sessions.upsert("chat1", |s| s.budget.max_actions = 2).await.unwrap();
    let callbacks = Arc::new(RecordingCallbacks::new(sessions.clone(), "chat1"));

    let plan = ActionPlan {
        reason: "run four agents".to_string(),
        actions: (0..4)
            .map(|i| Action::RunAgent { agent_id: format!("agent{i}"), goal: "go".to_string(), inputs: Default::default(), risk: Risk::L1 })
            .collect(),
        final_response_style: FinalResponseStyle::Concise,
    };
    let resolver = |_: &str| None;
    let ctx = ActionContext { chat_id: "chat1".to_string(), user_id: "u1".to_string(), job_id: "job1".to_string() };

    let outcome = execute_plan(callbacks.as_ref(), ctx, plan, &allow_all(), &ApprovalConfig::default_policy(), &resolver, &sessions, false)
        .await
        .unwrap();

    assert_eq!(*callbacks.run_agent_calls.lock().await, vec!["agent0".to_string(), "agent1".to_string()]);
    assert_eq!(outcome.blocked_index, Some(2));
    assert_eq!(outcome.remaining_actions.len(), 2);
    assert_eq!(outcome.results[2].note, "blocked: budget exceeded");
    let session = sessions.get("chat1").await;
    assert_eq!(session.budget.used_actions, 2);
}

/// Scenario: cancellation mid-execution. A cancel-mode interrupt recorded between the first and
/// second action of a two-action plan stops the walk: the first action's `ok` result is present,
/// the second is never dispatched, and the executor reports a cancellation rather than a normal
/// outcome.
#[tokio::test]
async fn cancel_interrupt_mid_plan_stops_before_the_second_action() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
    sessions.upsert("chat1", |s| s.budget.max_actions = 5).await.unwrap();

    let mut callbacks = RecordingCallbacks::new(sessions.clone(), "chat1");
    callbacks.cancel_after_first = true;
    let callbacks = Arc::new(callbacks);

    let plan = ActionPlan {
        reason: "two steps".to_string(),
        actions: vec![
            Action::RunAgent { agent_id: "researcher".to_string(), goal: "step one".to_string(), inputs: Default::default(), risk: Risk::L1 },
            Action::RunAgent { agent_id: "coder".to_string(), goal: "step two".to_string(), inputs: Default::default(), risk: Risk::L1 },
        ],
        final_response_style: FinalResponseStyle::Concise,
    };
    let resolver = |_: &str| None;
    let ctx = ActionContext { chat_id: "chat1".to_string(), user_id: "u1".to_string(), job_id: "job1".to_string() };

    let err = execute_plan(callbacks.as_ref(), ctx, plan, &allow_all(), &ApprovalConfig::default_policy(), &resolver, &sessions, false)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(*callbacks.run_agent_calls.lock().await, vec!["researcher".to_string()]);
}

