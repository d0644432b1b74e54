//! Runtime for executing the chat
//!
//! One task owns the state machine and applies its effects. Callers talk to
//! it through a cloneable [`RuntimeHandle`]: events go in over an mpsc
//! channel, updates come out over a broadcast channel.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;

use crate::config::RevealTiming;
use crate::responder::Responder;
use crate::session::{SessionError, SessionId, SessionStore, TurnView};
use crate::state_machine::{ChatState, Event, TransitionError};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        /// Current session transcript, or `null` when none is selected
        session: Value,
        state: Value,
    },
    TurnAppended {
        session_id: SessionId,
        turn: TurnView,
    },
    TurnUpdated {
        session_id: SessionId,
        turn_id: String,
        content: String,
    },
    StateChange {
        /// Full state as JSON object (e.g., `{"type":"revealing",...}`)
        state: Value,
    },
    ReplyDone {
        session_id: SessionId,
        turn_id: String,
    },
    Error {
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Chat runtime is not running")]
    Closed,
}

/// Where an accepted submission was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub session_id: SessionId,
    pub turn_id: String,
}

/// Handle to interact with the running chat
#[derive(Clone)]
pub struct RuntimeHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_rx: watch::Receiver<ChatState>,
    sessions: Arc<SessionStore>,
}

impl RuntimeHandle {
    /// Start the runtime task
    pub fn spawn(
        sessions: Arc<SessionStore>,
        responder: Arc<dyn Responder>,
        timing: RevealTiming,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(ChatState::Idle);

        let runtime = ChatRuntime::new(
            sessions.clone(),
            responder,
            timing,
            event_rx,
            event_tx.downgrade(),
            broadcast_tx.clone(),
            state_tx,
        );

        tokio::spawn(async move {
            runtime.run().await;
        });

        Self {
            event_tx,
            broadcast_tx,
            state_rx,
            sessions,
        }
    }

    /// Submit user text to the current session, creating one if there is none.
    ///
    /// Whitespace-only text is rejected here. A submission that arrives while
    /// a reply is in flight is rejected by the runtime and reported as an
    /// `error` event.
    pub async fn submit(&self, text: String) -> Result<Submission, RuntimeError> {
        if text.trim().is_empty() {
            return Err(RuntimeError::EmptyMessage);
        }

        let session_id = self.sessions.ensure_current()?;
        let turn_id = uuid::Uuid::new_v4().to_string();

        self.send(Event::UserMessage {
            session_id,
            turn_id: turn_id.clone(),
            text,
        })
        .await?;

        Ok(Submission {
            session_id,
            turn_id,
        })
    }

    /// Stop the reveal in progress
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.send(Event::UserStop).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Latest state published by the runtime
    pub fn state(&self) -> ChatState {
        self.state_rx.borrow().clone()
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed)
    }
}
