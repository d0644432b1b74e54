//! Mock implementations for testing
//!
//! These mocks drive the real runtime without network or disk I/O.

use super::{RuntimeHandle, SseEvent, Submission};
use crate::config::RevealTiming;
use crate::responder::{Responder, ResponderError};
use crate::session::{SessionStore, Turn};
use crate::storage::{InMemoryStore, KeyValueStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Responder
// ============================================================================

/// Mock responder that returns queued replies
pub struct MockResponder {
    replies: Mutex<VecDeque<Result<String, ResponderError>>>,
    /// Record of every user text passed in
    pub requests: Mutex<Vec<String>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: ResponderError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, text: &str) -> Result<String, ResponderError> {
        self.requests.lock().unwrap().push(text.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ResponderError::network("No mock reply queued")))
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn produce_reply(&self, text: &str) -> Result<String, ResponderError> {
        self.next(text)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Delayed Mock Responder (for busy and stop testing)
// ============================================================================

/// Mock responder that holds every reply for a fixed delay
pub struct DelayedMockResponder {
    inner: MockResponder,
    delay: Duration,
}

impl DelayedMockResponder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockResponder::new(),
            delay,
        }
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.inner.queue_reply(reply);
    }

    pub fn recorded_requests(&self) -> Vec<String> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl Responder for DelayedMockResponder {
    async fn produce_reply(&self, text: &str) -> Result<String, ResponderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.next(text)
    }

    fn name(&self) -> &str {
        "delayed-mock"
    }
}

// ============================================================================
// Flaky Storage (for write failure testing)
// ============================================================================

/// Wraps an in-memory store; writes fail while `set_failing(true)`
pub struct FlakyStore {
    inner: Arc<InMemoryStore>,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk full".to_string()));
        }
        self.inner.set(key, value)
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

/// Reveal pacing short enough for tests
pub const FAST_REVEAL: RevealTiming = RevealTiming {
    initial_delay: Duration::from_millis(5),
    tick_interval: Duration::from_millis(1),
};

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime<R: Responder + 'static> {
    pub handle: RuntimeHandle,
    pub storage: Arc<InMemoryStore>,
    /// Sits in front of `storage`; flip it to make session writes fail
    pub faults: Arc<FlakyStore>,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
    pub responder: Arc<R>,
}

impl TestRuntime<MockResponder> {
    /// Create a simple test runtime with an instant mock
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestRuntimeBuilder<MockResponder> {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder<R> {
    responder: R,
    storage: Option<Arc<InMemoryStore>>,
    timing: RevealTiming,
}

impl TestRuntimeBuilder<MockResponder> {
    pub fn new() -> Self {
        Self {
            responder: MockResponder::new(),
            storage: None,
            timing: FAST_REVEAL,
        }
    }
}

impl Default for TestRuntimeBuilder<MockResponder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Responder + 'static> TestRuntimeBuilder<R> {
    pub fn responder<N: Responder + 'static>(self, responder: N) -> TestRuntimeBuilder<N> {
        TestRuntimeBuilder {
            responder,
            storage: self.storage,
            timing: self.timing,
        }
    }

    /// Start from an existing store, e.g. to simulate a restart
    pub fn storage(mut self, storage: Arc<InMemoryStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn timing(mut self, timing: RevealTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn build(self) -> TestRuntime<R> {
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let faults = Arc::new(FlakyStore::new(storage.clone()));
        let sessions = Arc::new(SessionStore::load(faults.clone()).unwrap());
        let responder = Arc::new(self.responder);

        let handle = RuntimeHandle::spawn(sessions, responder.clone(), self.timing);
        let broadcast_rx = handle.subscribe();

        TestRuntime {
            handle,
            storage,
            faults,
            broadcast_rx,
            responder,
        }
    }
}

impl<R: Responder + 'static> TestRuntime<R> {
    /// Submit user text through the handle
    pub async fn send_message(&self, text: &str) -> Submission {
        self.handle
            .submit(text.to_string())
            .await
            .expect("Failed to submit message")
    }

    pub async fn send_stop(&self) {
        self.handle.stop().await.expect("Failed to send stop");
    }

    /// Wait for the first event matching `pred`
    pub async fn wait_for(
        &mut self,
        timeout: Duration,
        mut pred: impl FnMut(&SseEvent) -> bool,
    ) -> Option<SseEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(event)) if pred(&event) => return Some(event),
                _ => continue,
            }
        }
        None
    }

    /// Wait for `ReplyDone` with timeout
    pub async fn wait_for_done(&mut self, timeout: Duration) -> bool {
        self.wait_for(timeout, |e| matches!(e, SseEvent::ReplyDone { .. }))
            .await
            .is_some()
    }

    /// Wait for a specific state type with timeout
    pub async fn wait_for_state(&mut self, expected_type: &str, timeout: Duration) -> bool {
        self.wait_for(timeout, |e| match e {
            SseEvent::StateChange { state } => {
                state.get("type").and_then(|v| v.as_str()) == Some(expected_type)
            }
            _ => false,
        })
        .await
        .is_some()
    }

    /// Wait for an `error` event and return its message
    pub async fn wait_for_error(&mut self, timeout: Duration) -> Option<String> {
        match self
            .wait_for(timeout, |e| matches!(e, SseEvent::Error { .. }))
            .await
        {
            Some(SseEvent::Error { message }) => Some(message),
            _ => None,
        }
    }

    /// Every event up to and including the next `ReplyDone`
    pub async fn collect_until_done(&mut self, timeout: Duration) -> Vec<SseEvent> {
        let mut events = Vec::new();
        self.wait_for(timeout, |e| {
            events.push(e.clone());
            matches!(e, SseEvent::ReplyDone { .. })
        })
        .await;
        events
    }

    /// Turns of the current session
    pub fn turns(&self) -> Vec<Turn> {
        self.handle
            .sessions()
            .current()
            .map(|s| s.messages)
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{KeywordResponder, APOLOGY, PROTEIN_REPLY};
    use crate::runtime::RuntimeError;
    use crate::session::{Role, TranscriptView, STORAGE_KEY};
    use crate::state_machine::ChatState;
    use crate::storage::KeyValueStore;

    const WAIT: Duration = Duration::from_secs(5);

    fn slow_reveal() -> RevealTiming {
        RevealTiming {
            initial_delay: Duration::from_millis(5),
            tick_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_mock_responder_queue() {
        let responder = MockResponder::new();
        responder.queue_reply("first");
        responder.queue_error(ResponderError::server_error("boom"));

        assert_eq!(responder.produce_reply("a").await.unwrap(), "first");
        assert!(responder.produce_reply("b").await.is_err());
        // Nothing queued
        assert!(responder.produce_reply("c").await.is_err());
        assert_eq!(responder.recorded_requests(), ["a", "b", "c"]);
    }

    /// Integration test: keyword reply typed out in full
    #[tokio::test]
    async fn test_keyword_reply_revealed_and_persisted() {
        let mut rt = TestRuntime::new()
            .responder(KeywordResponder::new())
            .build();

        rt.send_message("Best protein for breakfast?").await;
        assert!(rt.wait_for_done(WAIT).await);

        let turns = rt.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "Best protein for breakfast?");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, PROTEIN_REPLY);

        let stored = rt.storage.get(STORAGE_KEY).unwrap().unwrap();
        assert!(stored.contains(PROTEIN_REPLY));
        assert_eq!(rt.handle.state(), ChatState::Idle);
    }

    /// Each tick adds one character; loading clears exactly once
    #[tokio::test]
    async fn test_reveal_grows_one_char_per_tick() {
        let mut rt = TestRuntime::new().build();
        rt.responder.queue_reply("Eat greens.");

        rt.send_message("tips?").await;
        let events = rt.collect_until_done(WAIT).await;

        let updates: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                SseEvent::TurnUpdated { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), "Eat greens.".len());
        for (i, content) in updates.iter().enumerate() {
            assert_eq!(content.chars().count(), i + 1);
        }
        assert_eq!(updates.last().copied(), Some("Eat greens."));

        // No second ReplyDone trails the first
        assert!(!rt.wait_for_done(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_placeholder_appended_before_reveal() {
        let mut rt = TestRuntime::new().build();
        rt.responder.queue_reply("ok");

        rt.send_message("hi there").await;
        let events = rt.collect_until_done(WAIT).await;

        let appended: Vec<(Role, String, bool)> = events
            .iter()
            .filter_map(|e| match e {
                SseEvent::TurnAppended { turn, .. } => {
                    Some((turn.role, turn.content.clone(), turn.typing))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            appended,
            vec![
                (Role::User, "hi there".to_string(), false),
                (Role::Assistant, String::new(), true),
            ]
        );
    }

    /// Integration test: stop mid-reveal keeps a strict prefix
    #[tokio::test]
    async fn test_stop_mid_reveal_keeps_prefix() {
        let reply = "Whole grains, legumes and leafy greens make a solid base. ".repeat(4);
        let mut rt = TestRuntime::new().timing(slow_reveal()).build();
        rt.responder.queue_reply(reply.clone());

        rt.send_message("what should I eat?").await;
        assert!(rt
            .wait_for(WAIT, |e| matches!(e, SseEvent::TurnUpdated { .. }))
            .await
            .is_some());

        rt.send_stop().await;
        assert!(rt.wait_for_state("stopped", WAIT).await);
        assert!(rt.wait_for_done(WAIT).await);

        let partial = rt.turns()[1].content.clone();
        assert!(!partial.is_empty());
        assert!(partial.len() < reply.len());
        assert!(reply.starts_with(&partial));
        assert_eq!(rt.handle.state(), ChatState::Idle);

        // Stopped content is what got persisted
        let stored = rt.storage.get(STORAGE_KEY).unwrap().unwrap();
        assert!(stored.contains(&partial));
        assert!(!stored.contains(&reply));

        // Ready for the next submission
        rt.responder.queue_reply("next");
        rt.send_message("again").await;
        assert!(rt.wait_for_done(WAIT).await);
        assert_eq!(rt.turns().len(), 4);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick_leaves_empty_turn() {
        let mut rt = TestRuntime::new()
            .timing(RevealTiming {
                initial_delay: Duration::from_secs(30),
                tick_interval: Duration::from_millis(1),
            })
            .build();
        rt.responder.queue_reply("never shown");

        rt.send_message("hello").await;
        assert!(rt.wait_for_state("revealing", WAIT).await);

        rt.send_stop().await;
        assert!(rt.wait_for_done(WAIT).await);

        let session = rt.handle.sessions().current().unwrap();
        assert_eq!(session.messages[1].content, "");
        let view = TranscriptView::from(&session).with_active_turn(rt.handle.state().active_turn());
        assert!(!view.turns[1].typing);
    }

    /// Integration test: failed reply becomes the apology plus an error event
    #[tokio::test]
    async fn test_failure_reveals_apology_and_reports() {
        let mut rt = TestRuntime::new().build();
        rt.responder
            .queue_error(ResponderError::server_error("HTTP 502"));

        rt.send_message("vitamins?").await;
        let events = rt.collect_until_done(WAIT).await;

        assert!(events.iter().any(|e| matches!(
            e,
            SseEvent::Error { message } if message.contains("server_error") && message.contains("HTTP 502")
        )));
        assert_eq!(rt.turns()[1].content, APOLOGY);
    }

    #[tokio::test]
    async fn test_submit_while_busy_rejected() {
        let responder = DelayedMockResponder::new(Duration::from_millis(300));
        responder.queue_reply("first reply");
        let mut rt = TestRuntime::new()
            .responder(responder)
            .build();

        rt.send_message("one").await;
        assert!(rt.wait_for_state("responding", WAIT).await);

        rt.send_message("two").await;
        let error = rt.wait_for_error(WAIT).await.unwrap();
        assert!(error.contains("busy"), "unexpected error: {error}");

        assert!(rt.wait_for_done(WAIT).await);
        let turns = rt.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "one");
        assert_eq!(rt.responder.recorded_requests(), ["one"]);
    }

    #[tokio::test]
    async fn test_stop_while_responding_rejected() {
        let responder = DelayedMockResponder::new(Duration::from_millis(200));
        responder.queue_reply("arrives anyway");
        let mut rt = TestRuntime::new()
            .responder(responder)
            .build();

        rt.send_message("question").await;
        assert!(rt.wait_for_state("responding", WAIT).await);

        rt.send_stop().await;
        let error = rt.wait_for_error(WAIT).await.unwrap();
        assert!(error.contains("cannot be stopped"), "unexpected error: {error}");

        assert!(rt.wait_for_done(WAIT).await);
        assert_eq!(rt.turns()[1].content, "arrives anyway");
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_silent() {
        let mut rt = TestRuntime::new().build();
        rt.send_stop().await;
        assert!(rt
            .wait_for(Duration::from_millis(100), |_| true)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_blank_submission_rejected_without_session() {
        let rt = TestRuntime::new().build();
        let err = rt.handle.submit("  \t".to_string()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::EmptyMessage));
        assert!(rt.handle.sessions().sessions().is_empty());
    }

    #[tokio::test]
    async fn test_first_submission_creates_session() {
        let mut rt = TestRuntime::new().build();
        rt.responder.queue_reply("hi!");
        assert!(rt.handle.sessions().current_id().is_none());

        let submission = rt.send_message("hey").await;
        assert!(rt.wait_for_done(WAIT).await);

        assert_eq!(rt.handle.sessions().sessions().len(), 1);
        assert_eq!(
            rt.handle.sessions().current_id(),
            Some(submission.session_id)
        );
    }

    /// A reply lands in the session it was asked from, even after switching
    #[tokio::test]
    async fn test_reply_stays_in_originating_session() {
        let responder = DelayedMockResponder::new(Duration::from_millis(100));
        responder.queue_reply("for session A");
        let mut rt = TestRuntime::new()
            .responder(responder)
            .build();

        let first = rt.send_message("asked in A").await;
        assert!(rt.wait_for_state("responding", WAIT).await);
        let second = rt.handle.sessions().create_session().unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        let a = rt.handle.sessions().get(first.session_id).unwrap();
        let b = rt.handle.sessions().get(second.id).unwrap();
        assert_eq!(a.messages.len(), 2);
        assert_eq!(a.messages[1].content, "for session A");
        assert!(b.messages.is_empty());
        assert_eq!(rt.handle.sessions().current_id(), Some(second.id));
    }

    /// Integration test: a restart reloads exactly what was persisted
    #[tokio::test]
    async fn test_transcript_survives_reload() {
        let mut rt = TestRuntime::new().build();
        rt.responder.queue_reply("Drink water.");
        rt.send_message("hydration?").await;
        assert!(rt.wait_for_done(WAIT).await);
        let before = rt.handle.sessions().snapshot();

        let reloaded = TestRuntime::new().storage(rt.storage.clone()).build();
        assert_eq!(reloaded.handle.sessions().snapshot(), before);
        assert_eq!(reloaded.turns()[1].content, "Drink water.");
    }

    /// Integration test: write failures are reported but never leave the chat busy
    #[tokio::test]
    async fn test_storage_failure_does_not_wedge_runtime() {
        let mut rt = TestRuntime::new().build();
        rt.handle.sessions().create_session().unwrap();
        rt.responder.queue_reply("Eat more beans.");

        rt.faults.set_failing(true);
        rt.send_message("what should I eat?").await;
        let error = rt.wait_for_error(WAIT).await.unwrap();
        assert!(error.contains("disk full"), "unexpected error: {error}");

        // Reply still arrives and is typed out in memory
        assert!(rt.wait_for_done(WAIT).await);
        assert_eq!(rt.handle.state(), ChatState::Idle);
        assert_eq!(rt.turns()[1].content, "Eat more beans.");

        rt.faults.set_failing(false);
        rt.responder.queue_reply("And lentils.");
        rt.send_message("anything else?").await;
        assert!(rt.wait_for_done(WAIT).await);

        // First successful write carries the turns the failed writes missed
        let stored = rt.storage.get(STORAGE_KEY).unwrap().unwrap();
        assert!(stored.contains("Eat more beans."));
        assert!(stored.contains("And lentils."));
    }

    /// Integration test: a failed write mid-reveal still lets stop settle the turn
    #[tokio::test]
    async fn test_storage_failure_mid_reveal_still_stops() {
        let mut rt = TestRuntime::new().timing(slow_reveal()).build();
        rt.handle.sessions().create_session().unwrap();
        rt.responder.queue_reply("Leafy greens are rich in folate and iron.");

        rt.send_message("greens?").await;
        assert!(rt
            .wait_for(WAIT, |e| matches!(e, SseEvent::TurnUpdated { .. }))
            .await
            .is_some());
        rt.faults.set_failing(true);

        rt.send_stop().await;
        assert!(rt.wait_for_error(WAIT).await.is_some());
        assert_eq!(rt.handle.state(), ChatState::Idle);
    }

    /// Integration test: the runtime winds down once the last handle is gone
    #[tokio::test]
    async fn test_runtime_exits_after_last_handle_dropped() {
        let rt = TestRuntime::new().timing(slow_reveal()).build();
        rt.responder.queue_reply("Oats.");
        let mut rx = rt.handle.subscribe();
        rt.send_message("breakfast?").await;
        drop(rt);

        // The reveal in flight still completes, then the channel closes
        let outcome = tokio::time::timeout(WAIT, async {
            let mut done = false;
            loop {
                match rx.recv().await {
                    Ok(SseEvent::ReplyDone { .. }) => done = true,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return done,
                }
            }
        })
        .await;
        assert_eq!(outcome, Ok(true));
    }
}
