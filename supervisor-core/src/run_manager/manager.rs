//! Per-chat drain loop: `handleIncoming`/`hardCancel`/`drainLoop` (spec §4.8).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::action::InterruptMode;
use crate::session::{ChatId, Interrupt, PendingMessage, RunState, SessionStore};

use super::callback::{AckSink, RunChatCallback};
use super::error::RunManagerError;
use super::types::{HandleIncomingOutcome, InputKind, RunChatInput};

struct ChatHandle {
    cancel: CancellationToken,
    running: bool,
    /// The synthetic merged message currently in flight, so a replan preemption can requeue it
    /// rather than lose it.
    in_flight: Option<PendingMessage>,
    last_ack: Option<Instant>,
}

impl Default for ChatHandle {
    fn default() -> Self {
        ChatHandle { cancel: CancellationToken::new(), running: false, in_flight: None, last_ack: None }
    }
}

struct Inner<R, A> {
    sessions: Arc<SessionStore>,
    callback: Arc<R>,
    ack: Arc<A>,
    handles: Mutex<HashMap<ChatId, ChatHandle>>,
    debounce: Duration,
    ack_min_gap: Duration,
}

/// One instance per process. Cheaply `Clone`-able (shares an `Arc`'d inner); clones are handed
/// to spawned drain-loop tasks.
pub struct RunManager<R, A> {
    inner: Arc<Inner<R, A>>,
}

impl<R, A> Clone for RunManager<R, A> {
    fn clone(&self) -> Self {
        RunManager { inner: self.inner.clone() }
    }
}

impl<R, A> RunManager<R, A>
where
    R: RunChatCallback + 'static,
    A: AckSink + 'static,
{
    pub fn new(sessions: Arc<SessionStore>, callback: Arc<R>, ack: Arc<A>) -> Self {
        Self::with_timing(sessions, callback, ack, Duration::from_millis(300), Duration::from_millis(500))
    }

    pub fn with_timing(
        sessions: Arc<SessionStore>,
        callback: Arc<R>,
        ack: Arc<A>,
        debounce: Duration,
        ack_min_gap: Duration,
    ) -> Self {
        RunManager {
            inner: Arc::new(Inner {
                sessions,
                callback,
                ack,
                handles: Mutex::new(HashMap::new()),
                debounce,
                ack_min_gap,
            }),
        }
    }

    /// Trims and queues `text`. If a run is already in flight for `chat_id` (routing, executing,
    /// awaiting approval, or a parked approval) this preempts it: the in-flight call is
    /// cancelled, the interrupt is recorded as a replan, and the text will be merged into the
    /// next drain iteration. Otherwise a drain loop is (lazily) started.
    pub async fn handle_incoming(
        &self,
        chat_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<HandleIncomingOutcome, RunManagerError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(HandleIncomingOutcome::Ignored);
        }

        self.inner
            .sessions
            .upsert(chat_id, |s| {
                s.push_pending_message(PendingMessage {
                    ts: chrono::Utc::now(),
                    user_id: user_id.to_string(),
                    text: text.to_string(),
                    external_message_id: None,
                });
            })
            .await?;

        let session = self.inner.sessions.get(chat_id).await;
        let busy = matches!(session.state, RunState::Routing | RunState::Executing | RunState::AwaitingApproval)
            || session.pending_approval.is_some();

        if busy {
            self.inner
                .sessions
                .upsert(chat_id, |s| {
                    s.pending_approval = None;
                    s.interrupt = Some(Interrupt {
                        requested: true,
                        mode: InterruptMode::Replan,
                        reason: text.to_string(),
                        ts: chrono::Utc::now(),
                    });
                })
                .await?;
            self.cancel_current(chat_id).await;
            self.maybe_ack(chat_id, "got your update, folding it into the current run").await;
            self.ensure_drain_loop(chat_id).await;
            Ok(HandleIncomingOutcome::QueuedInterrupt)
        } else {
            self.ensure_drain_loop(chat_id).await;
            Ok(HandleIncomingOutcome::Started)
        }
    }

    /// Drops any pending approval and queued messages, marks the session idle, and cancels the
    /// in-flight call with `mode=cancel`.
    pub async fn hard_cancel(&self, chat_id: &str, reason: &str) -> Result<(), RunManagerError> {
        self.inner
            .sessions
            .upsert(chat_id, |s| {
                s.pending_approval = None;
                s.pending_user_messages.clear();
                s.interrupt = Some(Interrupt {
                    requested: true,
                    mode: InterruptMode::Cancel,
                    reason: reason.to_string(),
                    ts: chrono::Utc::now(),
                });
                s.state = RunState::Idle;
            })
            .await?;
        self.cancel_current(chat_id).await;
        self.inner.ack.ack(chat_id, reason).await;
        Ok(())
    }

    async fn cancel_current(&self, chat_id: &str) {
        let mut handles = self.inner.handles.lock().await;
        let handle = handles.entry(chat_id.to_string()).or_default();
        handle.cancel.cancel();
        handle.cancel = CancellationToken::new();
    }

    /// Acks are rate-limited per chat (default 500 ms) so repeated preemptions don't spam the
    /// transport.
    async fn maybe_ack(&self, chat_id: &str, text: &str) {
        let should_ack = {
            let mut handles = self.inner.handles.lock().await;
            let handle = handles.entry(chat_id.to_string()).or_default();
            let now = Instant::now();
            let should = handle.last_ack.map_or(true, |last| now.duration_since(last) >= self.inner.ack_min_gap);
            if should {
                handle.last_ack = Some(now);
            }
            should
        };
        if should_ack {
            self.inner.ack.ack(chat_id, text).await;
        }
    }

    async fn ensure_drain_loop(&self, chat_id: &str) {
        let should_spawn = {
            let mut handles = self.inner.handles.lock().await;
            let handle = handles.entry(chat_id.to_string()).or_default();
            if handle.running {
                false
            } else {
                handle.running = true;
                true
            }
        };
        if should_spawn {
            let manager = self.clone();
            let chat_id = chat_id.to_string();
            tokio::spawn(async move {
                manager.drain_loop(&chat_id).await;
            });
        }
    }

    async fn drain_queue(&self, chat_id: &str) -> Result<Vec<PendingMessage>, RunManagerError> {
        let drained = std::cell::RefCell::new(Vec::new());
        self.inner
            .sessions
            .upsert(chat_id, |s| {
                *drained.borrow_mut() = std::mem::take(&mut s.pending_user_messages);
            })
            .await?;
        Ok(drained.into_inner())
    }

    async fn drain_loop(&self, chat_id: &str) {
        loop {
            let mut drained = match self.drain_queue(chat_id).await {
                Ok(messages) if messages.is_empty() => break,
                Ok(messages) => messages,
                Err(e) => {
                    error!(chat_id, error = %e, "failed to drain pending messages");
                    break;
                }
            };

            if self.inner.debounce > Duration::ZERO {
                tokio::time::sleep(self.inner.debounce).await;
                match self.drain_queue(chat_id).await {
                    Ok(extra) => drained.extend(extra),
                    Err(e) => error!(chat_id, error = %e, "failed to drain burst additions"),
                }
            }

            let merged_text = merge_pending(&drained);
            let latest_user = drained.last().map(|m| m.user_id.clone()).unwrap_or_default();
            let merged = PendingMessage {
                ts: chrono::Utc::now(),
                user_id: latest_user.clone(),
                text: merged_text.clone(),
                external_message_id: None,
            };

            {
                let mut handles = self.inner.handles.lock().await;
                handles.entry(chat_id.to_string()).or_default().in_flight = Some(merged);
            }

            let run_id = uuid::Uuid::new_v4().to_string();
            if let Err(e) = self
                .inner
                .sessions
                .upsert(chat_id, |s| {
                    s.active_run_id = Some(run_id.clone());
                    s.interrupt = None;
                    s.state = RunState::Routing;
                })
                .await
            {
                error!(chat_id, error = %e, "failed to mark run routing");
                break;
            }

            let input_kind = if drained.len() > 1 { InputKind::InterruptUpdate } else { InputKind::Normal };
            let pending_count = drained.len();
            let input = RunChatInput {
                chat_id: chat_id.to_string(),
                user_id: latest_user,
                message: merged_text,
                run_id,
                input_kind,
                pending_count,
                pending_rows: drained,
                external_message_id: None,
            };

            let cancel = {
                let handles = self.inner.handles.lock().await;
                handles
                    .get(chat_id)
                    .map(|h| h.cancel.clone())
                    .unwrap_or_else(CancellationToken::new)
            };

            let result = self.inner.callback.run_chat(input, &cancel).await;

            if let Err(e) = &result {
                if e.is_cancelled() {
                    let requeue = {
                        let mut handles = self.inner.handles.lock().await;
                        handles.get_mut(chat_id).and_then(|h| h.in_flight.take())
                    };
                    if let Some(msg) = requeue {
                        let _ = self.inner.sessions.upsert(chat_id, |s| s.pending_user_messages.insert(0, msg)).await;
                    }
                } else {
                    error!(chat_id, error = %e, "run failed");
                    self.inner.ack.ack(chat_id, &format!("run failed: {e}")).await;
                }
            }

            {
                let mut handles = self.inner.handles.lock().await;
                if let Some(handle) = handles.get_mut(chat_id) {
                    handle.in_flight = None;
                }
            }

            if let Err(e) = self
                .inner
                .sessions
                .upsert(chat_id, |s| {
                    s.active_run_id = None;
                    s.interrupt = None;
                    s.state = if s.pending_approval.is_some() { RunState::AwaitingApproval } else { RunState::Idle };
                })
                .await
            {
                error!(chat_id, error = %e, "failed to finalize run state");
                break;
            }
        }

        let mut handles = self.inner.handles.lock().await;
        if let Some(handle) = handles.get_mut(chat_id) {
            handle.running = false;
        }
    }
}

/// Merges queued messages into one synthetic message: the latest leads, followed by an
/// "additional instructions" bullet list of the earlier ones.
fn merge_pending(messages: &[PendingMessage]) -> String {
    match messages.split_last() {
        None => String::new(),
        Some((latest, [])) => latest.text.clone(),
        Some((latest, earlier)) => {
            let bullets = earlier.iter().map(|m| format!("- {}", m.text)).collect::<Vec<_>>().join("\n");
            format!("{}\n\nadditional instructions:\n{bullets}", latest.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex as TokioMutex;
    use tokio::time::sleep;

    use super::*;

    fn msg(text: &str) -> PendingMessage {
        PendingMessage { ts: chrono::Utc::now(), user_id: "u1".to_string(), text: text.to_string(), external_message_id: None }
    }

    #[test]
    fn merge_pending_single_message_is_untouched() {
        assert_eq!(merge_pending(&[msg("A")]), "A");
    }

    #[test]
    fn merge_pending_multiple_leads_with_latest_then_bullets_earlier() {
        let merged = merge_pending(&[msg("A"), msg("B")]);
        assert_eq!(merged, "B\n\nadditional instructions:\n- A");
    }

    #[test]
    fn merge_pending_empty_is_empty_string() {
        assert_eq!(merge_pending(&[]), "");
    }

    struct RecordingCallback {
        calls: TokioMutex<Vec<RunChatInput>>,
        delay: Duration,
    }

    #[async_trait]
    impl RunChatCallback for RecordingCallback {
        async fn run_chat(&self, input: RunChatInput, cancel: &CancellationToken) -> Result<(), RunManagerError> {
            self.calls.lock().await.push(input);
            tokio::select! {
                _ = sleep(self.delay) => Ok(()),
                _ = cancel.cancelled() => Err(RunManagerError::Cancelled),
            }
        }
    }

    struct CountingAck {
        count: AtomicUsize,
    }

    #[async_trait]
    impl AckSink for CountingAck {
        async fn ack(&self, _chat_id: &str, _text: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_for_idle(sessions: &SessionStore, chat_id: &str) {
        for _ in 0..200 {
            if sessions.get(chat_id).await.state == RunState::Idle {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("run never settled back to idle");
    }

    #[tokio::test]
    async fn simple_run_completes_and_settles_idle() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
        let callback = Arc::new(RecordingCallback { calls: TokioMutex::new(Vec::new()), delay: Duration::from_millis(20) });
        let ack = Arc::new(CountingAck { count: AtomicUsize::new(0) });
        let manager = RunManager::with_timing(sessions.clone(), callback.clone(), ack, Duration::ZERO, Duration::from_millis(50));

        let outcome = manager.handle_incoming("chat1", "u1", "please summarize the plan").await.unwrap();
        assert_eq!(outcome, HandleIncomingOutcome::Started);

        wait_for_idle(&sessions, "chat1").await;
        let calls = callback.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].message, "please summarize the plan");
    }

    #[tokio::test]
    async fn preempt_merges_second_message_into_replanned_run() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
        let callback = Arc::new(RecordingCallback { calls: TokioMutex::new(Vec::new()), delay: Duration::from_millis(300) });
        let ack = Arc::new(CountingAck { count: AtomicUsize::new(0) });
        let manager = RunManager::with_timing(sessions.clone(), callback.clone(), ack, Duration::ZERO, Duration::from_millis(50));

        manager.handle_incoming("chat1", "u1", "A").await.unwrap();
        sleep(Duration::from_millis(50)).await;
        let outcome = manager.handle_incoming("chat1", "u1", "B").await.unwrap();
        assert_eq!(outcome, HandleIncomingOutcome::QueuedInterrupt);

        wait_for_idle(&sessions, "chat1").await;
        let calls = callback.calls.lock().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].message, "A");
        assert_eq!(calls[1].message, "B\n\nadditional instructions:\n- A");
    }

    #[tokio::test]
    async fn ignores_blank_input() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
        let callback = Arc::new(RecordingCallback { calls: TokioMutex::new(Vec::new()), delay: Duration::from_millis(10) });
        let ack = Arc::new(CountingAck { count: AtomicUsize::new(0) });
        let manager = RunManager::new(sessions.clone(), callback.clone(), ack);

        let outcome = manager.handle_incoming("chat1", "u1", "   ").await.unwrap();
        assert_eq!(outcome, HandleIncomingOutcome::Ignored);
        assert!(callback.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn hard_cancel_clears_queue_and_acks() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionStore::load(dir.path().join("s.json")).await.unwrap());
        let callback = Arc::new(RecordingCallback { calls: TokioMutex::new(Vec::new()), delay: Duration::from_millis(10) });
        let ack = Arc::new(CountingAck { count: AtomicUsize::new(0) });
        let manager = RunManager::new(sessions.clone(), callback, ack.clone());

        sessions.upsert("chat1", |s| s.state = RunState::Executing).await.unwrap();
        manager.hard_cancel("chat1", "user_cancel").await.unwrap();

        let session = sessions.get("chat1").await;
        assert_eq!(session.state, RunState::Idle);
        assert!(session.pending_user_messages.is_empty());
        assert_eq!(ack.count.load(Ordering::SeqCst), 1);
    }
}
