//! Events that can occur in a chat

use crate::responder::ResponderError;
use crate::session::SessionId;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        session_id: SessionId,
        turn_id: String,
        text: String,
    },
    UserStop,

    // Responder events
    ReplyReady {
        turn_id: String,
        reply: String,
    },
    ReplyFailed {
        turn_id: String,
        error: ResponderError,
    },

    // Reveal ticker
    RevealTick {
        turn_id: String,
    },
}
