//! Chat sessions: storage-backed collection and per-session transcripts

mod migration;
mod store;
mod transcript;
mod types;

pub use store::{SessionError, SessionStore};
pub use transcript::{TranscriptView, TurnView, NO_SESSION};
pub use types::{Session, SessionId, SessionSummary, Turn};

#[cfg(test)]
pub use store::STORAGE_KEY;
#[cfg(test)]
pub use transcript::EMPTY_TRANSCRIPT;
#[cfg(test)]
pub use types::Role;
