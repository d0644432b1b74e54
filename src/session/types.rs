//! Session and turn types

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Creation-time timestamp in milliseconds, unique within a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message exchanged in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Empty assistant turn that a reveal will fill in
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self::assistant(id, String::new())
    }

    /// An assistant turn with no content yet is still being typed
    pub fn is_typing(&self) -> bool {
        self.role == Role::Assistant && self.content.is_empty()
    }
}

/// One saved conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Display timestamp; older payloads call this `timestamp`
    #[serde(alias = "timestamp")]
    pub label: String,
    #[serde(deserialize_with = "super::migration::deserialize_turns")]
    pub messages: Vec<Turn>,
}

impl Session {
    pub fn new(id: SessionId, created_at: DateTime<Local>) -> Self {
        Self {
            id,
            label: format_label(created_at),
            messages: Vec::new(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            label: self.label.clone(),
            message_count: self.messages.len(),
        }
    }
}

/// Listing entry for the session sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub label: String,
    pub message_count: usize,
}

fn format_label<Tz: TimeZone>(at: DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}
