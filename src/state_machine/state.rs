//! Chat state types

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Progress of one typed-out reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    target: String,
    /// Characters shown so far
    revealed: usize,
    /// Length of `target` in characters
    total: usize,
}

impl Reveal {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let total = target.chars().count();
        Self {
            target,
            revealed: 0,
            total,
        }
    }

    /// Show one more character; no-op once complete
    pub fn advance(&mut self) {
        if self.revealed < self.total {
            self.revealed += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.total
    }

    #[cfg(test)]
    pub fn revealed_len(&self) -> usize {
        self.revealed
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The prefix of the target shown so far, on a character boundary
    pub fn visible(&self) -> String {
        self.target.chars().take(self.revealed).collect()
    }
}

/// Chat state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatState {
    /// Ready for user input
    #[default]
    Idle,

    /// User turn recorded, waiting on the responder
    Responding { session_id: SessionId },

    /// Typing a reply into an assistant turn
    Revealing {
        session_id: SessionId,
        turn_id: String,
        reveal: Reveal,
    },
}

impl ChatState {
    /// True while a submission would be rejected
    pub fn is_busy(&self) -> bool {
        !matches!(self, ChatState::Idle)
    }

    /// Assistant turn currently being typed out
    pub fn active_turn(&self) -> Option<&str> {
        match self {
            ChatState::Revealing { turn_id, .. } => Some(turn_id),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::Responding { .. } => "responding",
            ChatState::Revealing { .. } => "revealing",
        }
    }
}
