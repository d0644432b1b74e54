//! Key/value persistence for chat sessions
//!
//! The session store only needs `get`/`set` over a single well-known key, so
//! storage is an injected capability rather than a global slot.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage capability used by the session store
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }
}

/// Open the store named by `path`; `:memory:` selects the in-process store
pub fn open(path: &str) -> StorageResult<Arc<dyn KeyValueStore>> {
    if path == ":memory:" {
        tracing::info!("Using in-memory session storage");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    tracing::info!(path = %path, "Opening session database");
    Ok(Arc::new(SqliteStore::open(path)?))
}
