//! Chat runtime executor

use super::{RuntimeError, SseEvent};

use crate::config::RevealTiming;
use crate::responder::Responder;
use crate::session::{SessionStore, TurnView};
use crate::state_machine::{transition, ChatState, Effect, Event};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Owns the chat state and applies the effects of each transition
pub struct ChatRuntime {
    state: ChatState,
    sessions: Arc<SessionStore>,
    responder: Arc<dyn Responder>,
    timing: RevealTiming,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the runtime ends once every handle and background task is gone
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_tx: watch::Sender<ChatState>,
    /// Token to cancel the running reveal ticker
    reveal_cancel_token: Option<CancellationToken>,
}

impl ChatRuntime {
    pub fn new(
        sessions: Arc<SessionStore>,
        responder: Arc<dyn Responder>,
        timing: RevealTiming,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        state_tx: watch::Sender<ChatState>,
    ) -> Self {
        Self {
            state: ChatState::Idle,
            sessions,
            responder,
            timing,
            event_rx,
            event_tx,
            broadcast_tx,
            state_tx,
            reveal_cancel_token: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(responder = %self.responder.name(), "Starting chat runtime");

        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        self.report(&e);
                    }
                }
                else => break,
            }
        }

        tracing::info!("Chat runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), RuntimeError> {
        // Pure state transition
        let result = transition(&self.state, event)?;

        if result.new_state.name() != self.state.name() {
            tracing::debug!(
                from = self.state.name(),
                to = result.new_state.name(),
                "State change"
            );
        }
        self.state = result.new_state;
        self.state_tx.send_replace(self.state.clone());

        // The state is already committed, so a failed effect must not skip
        // the ones that move it forward (RequestReply, StartReveal)
        for effect in result.effects {
            if let Err(e) = self.execute_effect(effect) {
                self.report(&e);
            }
        }

        Ok(())
    }

    fn report(&self, error: &RuntimeError) {
        tracing::warn!(error = %error, state = self.state.name(), "Error handling event");
        let _ = self.broadcast_tx.send(SseEvent::Error {
            message: error.to_string(),
        });
    }

    /// Strong sender for a background task; `None` once every handle is gone
    fn task_sender(&self) -> Option<mpsc::Sender<Event>> {
        let sender = self.event_tx.upgrade();
        if sender.is_none() {
            tracing::debug!("All handles dropped, not starting background task");
        }
        sender
    }

    /// Execute an effect; long-running work is spawned and reports back as an event
    fn execute_effect(&mut self, effect: Effect) -> Result<(), RuntimeError> {
        match effect {
            Effect::AppendTurn { session_id, turn } => {
                let view = TurnView::from(&turn);
                self.sessions.append_turn(session_id, turn)?;
                let _ = self
                    .broadcast_tx
                    .send(SseEvent::TurnAppended { session_id, turn: view });
            }

            Effect::UpdateTurn {
                session_id,
                turn_id,
                content,
            } => {
                self.sessions
                    .set_turn_content(session_id, &turn_id, &content)?;
                let _ = self.broadcast_tx.send(SseEvent::TurnUpdated {
                    session_id,
                    turn_id,
                    content,
                });
            }

            Effect::PersistSessions => {
                self.sessions.persist()?;
            }

            Effect::RequestReply { text } => {
                let Some(event_tx) = self.task_sender() else {
                    return Ok(());
                };
                let responder = self.responder.clone();

                tokio::spawn(async move {
                    let turn_id = uuid::Uuid::new_v4().to_string();
                    let event = match responder.produce_reply(&text).await {
                        Ok(reply) => Event::ReplyReady { turn_id, reply },
                        Err(error) => Event::ReplyFailed { turn_id, error },
                    };
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::StartReveal { turn_id } => {
                self.cancel_reveal();
                let Some(event_tx) = self.task_sender() else {
                    return Ok(());
                };
                let cancel_token = CancellationToken::new();
                self.reveal_cancel_token = Some(cancel_token.clone());

                tokio::spawn(run_ticker(
                    turn_id,
                    self.timing,
                    event_tx,
                    cancel_token,
                ));
            }

            Effect::CancelReveal => {
                self.cancel_reveal();
            }

            Effect::NotifyState => {
                let state = serde_json::to_value(&self.state).unwrap_or(Value::Null);
                let _ = self.broadcast_tx.send(SseEvent::StateChange { state });
            }

            Effect::NotifyStopped { turn_id } => {
                tracing::info!(turn_id = %turn_id, "Reveal stopped");
                let _ = self.broadcast_tx.send(SseEvent::StateChange {
                    state: json!({ "type": "stopped", "turn_id": turn_id }),
                });
            }

            Effect::NotifyReplyDone {
                session_id,
                turn_id,
            } => {
                let _ = self.broadcast_tx.send(SseEvent::ReplyDone {
                    session_id,
                    turn_id,
                });
            }

            Effect::NotifyError { message } => {
                tracing::warn!(error = %message, "Reply replaced with apology");
                let _ = self.broadcast_tx.send(SseEvent::Error { message });
            }
        }
        Ok(())
    }

    fn cancel_reveal(&mut self) {
        if let Some(token) = self.reveal_cancel_token.take() {
            token.cancel();
        }
    }
}

impl Drop for ChatRuntime {
    fn drop(&mut self) {
        self.cancel_reveal();
    }
}

/// Send one `RevealTick` per interval after the initial delay, until cancelled
async fn run_ticker(
    turn_id: String,
    timing: RevealTiming,
    event_tx: mpsc::Sender<Event>,
    cancel_token: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel_token.cancelled() => return,
        () = tokio::time::sleep(timing.initial_delay) => {}
    }

    let mut ticker = tokio::time::interval(timing.tick_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let tick = Event::RevealTick { turn_id: turn_id.clone() };
                if event_tx.send(tick).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(turn_id = %turn_id, "Reveal ticker finished");
}
