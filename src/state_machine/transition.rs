//! Pure state transition function
//!
//! Given the same state and event this always produces the same result; all
//! I/O is described by the returned effects.

use super::state::Reveal;
use super::{ChatState, Effect, Event};
use crate::responder::APOLOGY;
use crate::session::SessionId;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Assistant is busy, wait for the current reply or stop it first")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Reply is still pending and cannot be stopped")]
    ReplyPending,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &ChatState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submission
        // ============================================================

        (ChatState::Idle, Event::UserMessage { session_id, turn_id, text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            Ok(TransitionResult::new(ChatState::Responding { session_id })
                .with_effect(Effect::append_user_turn(session_id, turn_id, text.clone()))
                .with_effect(Effect::NotifyState)
                .with_effect(Effect::RequestReply { text }))
        }

        // One pending reply at a time; new input is rejected, not queued
        (ChatState::Responding { .. } | ChatState::Revealing { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Reply arrival
        // ============================================================

        (ChatState::Responding { session_id }, Event::ReplyReady { turn_id, reply }) => {
            Ok(begin_reveal(*session_id, turn_id, reply))
        }

        (ChatState::Responding { session_id }, Event::ReplyFailed { turn_id, error }) => {
            Ok(begin_reveal(*session_id, turn_id, APOLOGY.to_string()).with_effect(
                Effect::NotifyError {
                    message: format!("Reply failed ({}): {}", error.kind.as_str(), error.message),
                },
            ))
        }

        (ChatState::Idle | ChatState::Revealing { .. }, Event::ReplyReady { .. } | Event::ReplyFailed { .. }) => {
            Err(TransitionError::InvalidTransition(format!(
                "reply arrived while {}",
                state.name()
            )))
        }

        // ============================================================
        // Reveal ticks
        // ============================================================

        (
            ChatState::Revealing {
                session_id,
                turn_id,
                reveal,
            },
            Event::RevealTick { turn_id: tick_turn },
        ) if *turn_id == tick_turn => {
            let mut reveal = reveal.clone();
            reveal.advance();

            if reveal.is_complete() {
                Ok(TransitionResult::new(ChatState::Idle).with_effects([
                    Effect::UpdateTurn {
                        session_id: *session_id,
                        turn_id: turn_id.clone(),
                        content: reveal.target().to_string(),
                    },
                    Effect::CancelReveal,
                    Effect::PersistSessions,
                    Effect::NotifyState,
                    Effect::NotifyReplyDone {
                        session_id: *session_id,
                        turn_id: turn_id.clone(),
                    },
                ]))
            } else {
                let content = reveal.visible();
                Ok(TransitionResult::new(ChatState::Revealing {
                    session_id: *session_id,
                    turn_id: turn_id.clone(),
                    reveal,
                })
                .with_effect(Effect::UpdateTurn {
                    session_id: *session_id,
                    turn_id: turn_id.clone(),
                    content,
                }))
            }
        }

        // Ticks left over from a finished or stopped reveal
        (_, Event::RevealTick { .. }) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Stop
        // ============================================================

        (
            ChatState::Revealing {
                session_id,
                turn_id,
                ..
            },
            Event::UserStop,
        ) => Ok(TransitionResult::new(ChatState::Idle).with_effects([
            Effect::CancelReveal,
            Effect::PersistSessions,
            Effect::NotifyStopped {
                turn_id: turn_id.clone(),
            },
            Effect::NotifyState,
            Effect::NotifyReplyDone {
                session_id: *session_id,
                turn_id: turn_id.clone(),
            },
        ])),

        // The responder call has no cancellation path
        (ChatState::Responding { .. }, Event::UserStop) => Err(TransitionError::ReplyPending),

        (ChatState::Idle, Event::UserStop) => Ok(TransitionResult::new(ChatState::Idle)),
    }
}

/// Insert the empty placeholder turn and start typing `reply` into it
fn begin_reveal(session_id: SessionId, turn_id: String, reply: String) -> TransitionResult {
    TransitionResult::new(ChatState::Revealing {
        session_id,
        turn_id: turn_id.clone(),
        reveal: Reveal::new(reply),
    })
    .with_effect(Effect::append_placeholder(session_id, turn_id.clone()))
    .with_effect(Effect::NotifyState)
    .with_effect(Effect::StartReveal { turn_id })
}
