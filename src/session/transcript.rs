//! Ordered turns of one session and their rendered view

use super::types::{Role, Session, SessionId, Turn};
use serde::Serialize;

/// Shown in place of an empty turn list
pub const EMPTY_TRANSCRIPT: &str = "No messages yet.";

/// Shown when no session is selected
pub const NO_SESSION: &str = "Select a conversation or start a new chat.";

impl Session {
    /// Add a turn after every existing one
    pub fn append(&mut self, turn: Turn) {
        self.messages.push(turn);
    }

    /// Replace the content of an existing turn; returns false if it is not here
    pub fn set_turn_content(&mut self, turn_id: &str, content: &str) -> bool {
        match self.messages.iter_mut().find(|t| t.id == turn_id) {
            Some(turn) => {
                content.clone_into(&mut turn.content);
                true
            }
            None => false,
        }
    }
}

/// A session as the client should draw it, oldest turn first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptView {
    pub id: SessionId,
    pub label: String,
    pub turns: Vec<TurnView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnView {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// The assistant is still producing this turn
    pub typing: bool,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id.clone(),
            role: turn.role,
            content: turn.content.clone(),
            typing: turn.is_typing(),
        }
    }
}

impl From<&Session> for TranscriptView {
    fn from(session: &Session) -> Self {
        let turns: Vec<TurnView> = session.messages.iter().map(TurnView::from).collect();

        Self {
            id: session.id,
            label: session.label.clone(),
            placeholder: turns.is_empty().then_some(EMPTY_TRANSCRIPT),
            turns,
        }
    }
}

impl TranscriptView {
    /// Only the turn being revealed right now shows the typing indicator.
    /// An empty assistant turn left behind by a stop renders as plain text.
    #[must_use]
    pub fn with_active_turn(mut self, active: Option<&str>) -> Self {
        for turn in &mut self.turns {
            turn.typing = turn.typing && active == Some(turn.id.as_str());
        }
        self
    }
}
