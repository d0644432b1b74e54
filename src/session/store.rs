//! Session collection with persist-on-change

use super::types::{Session, SessionId, SessionSummary, Turn};
use crate::storage::{KeyValueStore, StorageError};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Storage key holding the serialized session list
pub const STORAGE_KEY: &str = "chatSessions";

/// Unreadable payloads are copied here before the store starts empty
pub const BACKUP_KEY: &str = "chatSessions.corrupt";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Turn not found: {0}")]
    TurnNotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to encode sessions: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

struct Inner {
    sessions: Vec<Session>,
    current: Option<SessionId>,
}

impl Inner {
    fn find(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn find_mut(&mut self, id: SessionId) -> SessionResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SessionError::NotFound(id))
    }

    /// Creation timestamp, bumped past the newest id when the clock collides
    fn next_id(&self, now: DateTime<Local>) -> SessionId {
        let candidate = now.timestamp_millis();
        match self.sessions.iter().map(|s| s.id.0).max() {
            Some(max) if max >= candidate => SessionId(max + 1),
            _ => SessionId(candidate),
        }
    }
}

/// Owns every session; shared between the runtime and the HTTP handlers
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl SessionStore {
    /// Load the collection, selecting the newest session
    pub fn load(storage: Arc<dyn KeyValueStore>) -> SessionResult<Self> {
        let sessions = match storage.get(STORAGE_KEY)? {
            Some(raw) => match serde_json::from_str::<Vec<Session>>(&raw) {
                Ok(sessions) => sessions,
                Err(e) => {
                    // Next write replaces the payload, so keep a copy first
                    storage.set(BACKUP_KEY, &raw)?;
                    tracing::warn!(
                        error = %e,
                        backup_key = BACKUP_KEY,
                        "Stored sessions are unreadable, starting empty"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let current = sessions.last().map(|s| s.id);
        tracing::info!(count = sessions.len(), current = ?current, "Loaded chat sessions");

        Ok(Self {
            storage,
            inner: Mutex::new(Inner { sessions, current }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialize the whole collection under the storage key
    fn write(&self, inner: &Inner) -> SessionResult<()> {
        let payload = serde_json::to_string(&inner.sessions)?;
        self.storage.set(STORAGE_KEY, &payload)?;
        Ok(())
    }

    /// Write the current collection to storage
    pub fn persist(&self) -> SessionResult<()> {
        let inner = self.lock();
        self.write(&inner)
    }

    /// Start a new empty session and make it current
    pub fn create_session(&self) -> SessionResult<Session> {
        self.create_session_at(Local::now())
    }

    fn create_session_at(&self, now: DateTime<Local>) -> SessionResult<Session> {
        let mut inner = self.lock();
        let session = Session::new(inner.next_id(now), now);
        inner.sessions.push(session.clone());
        inner.current = Some(session.id);
        self.write(&inner)?;

        tracing::info!(session_id = %session.id, "Created chat session");
        Ok(session)
    }

    /// Make `id` current; an unknown id leaves the selection alone
    pub fn select_session(&self, id: SessionId) -> bool {
        let mut inner = self.lock();
        if inner.find(id).is_none() {
            tracing::debug!(session_id = %id, "Ignoring selection of unknown session");
            return false;
        }
        inner.current = Some(id);
        true
    }

    /// Current session id, creating a session when there is none at all
    pub fn ensure_current(&self) -> SessionResult<SessionId> {
        if let Some(id) = self.current_id() {
            return Ok(id);
        }
        Ok(self.create_session()?.id)
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.lock().current
    }

    pub fn current(&self) -> Option<Session> {
        let inner = self.lock();
        inner.current.and_then(|id| inner.find(id).cloned())
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.lock().find(id).cloned()
    }

    /// Summaries in creation order
    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.lock().sessions.iter().map(Session::summary).collect()
    }

    /// Append a turn to a session and persist
    pub fn append_turn(&self, id: SessionId, turn: Turn) -> SessionResult<()> {
        let mut inner = self.lock();
        inner.find_mut(id)?.append(turn);
        self.write(&inner)
    }

    /// Overwrite a turn's content in memory; callers persist when the turn settles
    pub fn set_turn_content(
        &self,
        id: SessionId,
        turn_id: &str,
        content: &str,
    ) -> SessionResult<()> {
        let mut inner = self.lock();
        if inner.find_mut(id)?.set_turn_content(turn_id, content) {
            Ok(())
        } else {
            Err(SessionError::TurnNotFound(turn_id.to_string()))
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }
}
