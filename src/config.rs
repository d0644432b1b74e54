//! Environment-driven configuration

use crate::responder::DEFAULT_ENDPOINT;
use std::str::FromStr;
use std::time::Duration;

/// Which reply strategy answers user turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponderKind {
    #[default]
    Keyword,
    Remote,
}

impl ResponderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyword" | "local" => Some(Self::Keyword),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Pacing of the typed-out reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTiming {
    /// Pause between the placeholder turn appearing and the first character
    pub initial_delay: Duration,
    /// One character is revealed per tick
    pub tick_interval: Duration,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            tick_interval: Duration::from_millis(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// SQLite path, or `:memory:` for a volatile store
    pub db_path: String,
    pub port: u16,
    pub responder: ResponderKind,
    pub chat_endpoint: String,
    /// `None` lets the remote call wait indefinitely
    pub remote_timeout: Option<Duration>,
    pub reveal: RevealTiming,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            port: 8000,
            responder: ResponderKind::default(),
            chat_endpoint: DEFAULT_ENDPOINT.to_string(),
            remote_timeout: None,
            reveal: RevealTiming::default(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            parsed(&lookup, key).map_or(fallback, Duration::from_millis)
        };

        let db_path = lookup("NOURISH_DB_PATH").unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.nourish-chat/chat.db")
        });

        let responder = match lookup("NOURISH_RESPONDER") {
            Some(value) => ResponderKind::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown NOURISH_RESPONDER, using keyword");
                ResponderKind::Keyword
            }),
            None => defaults.responder,
        };

        Self {
            db_path,
            port: parsed(&lookup, "NOURISH_PORT").unwrap_or(defaults.port),
            responder,
            chat_endpoint: lookup("NOURISH_CHAT_ENDPOINT").unwrap_or(defaults.chat_endpoint),
            remote_timeout: parsed(&lookup, "NOURISH_REMOTE_TIMEOUT_SECS").map(Duration::from_secs),
            reveal: RevealTiming {
                initial_delay: millis("NOURISH_REVEAL_DELAY_MS", defaults.reveal.initial_delay),
                // tokio intervals reject a zero period
                tick_interval: millis("NOURISH_REVEAL_TICK_MS", defaults.reveal.tick_interval)
                    .max(Duration::from_millis(1)),
            },
        }
    }
}

/// Value of `key` if set and parseable; anything else is logged and ignored
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable setting, using default");
            None
        }
    }
}
