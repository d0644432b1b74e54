//! Effects produced by state transitions

use crate::session::{SessionId, Turn};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a turn to a session (persists)
    AppendTurn { session_id: SessionId, turn: Turn },

    /// Overwrite a turn's content in memory
    UpdateTurn {
        session_id: SessionId,
        turn_id: String,
        content: String,
    },

    /// Write the session collection to storage
    PersistSessions,

    /// Ask the responder for a reply (spawns as background task)
    RequestReply { text: String },

    /// Start the reveal ticker for a turn
    StartReveal { turn_id: String },

    /// Cancel the running reveal ticker
    CancelReveal,

    /// Broadcast the new state to subscribers
    NotifyState,

    /// Broadcast that a reveal stopped early
    NotifyStopped { turn_id: String },

    /// Broadcast that the reply finished; clears the loading indicator
    NotifyReplyDone {
        session_id: SessionId,
        turn_id: String,
    },

    /// Broadcast an error without changing the transcript
    NotifyError { message: String },
}

impl Effect {
    pub fn append_user_turn(session_id: SessionId, turn_id: String, text: String) -> Self {
        Effect::AppendTurn {
            session_id,
            turn: Turn::user(turn_id, text),
        }
    }

    pub fn append_placeholder(session_id: SessionId, turn_id: String) -> Self {
        Effect::AppendTurn {
            session_id,
            turn: Turn::placeholder(turn_id),
        }
    }
}
