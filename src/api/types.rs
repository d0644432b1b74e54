//! API request and response types

use crate::session::{SessionId, SessionSummary, TranscriptView};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response with every session
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub current: Option<SessionId>,
}

/// Response with a single session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: TranscriptView,
}

/// Response for session selection
#[derive(Debug, Serialize)]
pub struct SelectResponse {
    /// False when the id was unknown and the selection did not change
    pub selected: bool,
    pub session: Option<TranscriptView>,
}

/// Response for the current session, which may not exist yet
#[derive(Debug, Serialize)]
pub struct CurrentSessionResponse {
    pub session: Option<TranscriptView>,
    pub placeholder: Option<&'static str>,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
    pub session_id: SessionId,
    pub turn_id: String,
}

/// Response for stop action
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub ok: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
