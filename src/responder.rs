//! Reply strategies
//!
//! Both strategies sit behind one capability so the runtime never knows
//! whether a reply came from the local keyword table or a remote endpoint.

mod error;
mod keyword;
mod remote;

pub use error::ResponderError;
#[cfg(test)]
pub use error::ResponderErrorKind;
pub use keyword::KeywordResponder;
#[cfg(test)]
pub use keyword::{GREETING_REPLY, PROTEIN_REPLY};
pub use remote::{RemoteResponder, DEFAULT_ENDPOINT};

use crate::config::{ChatConfig, ResponderKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Fixed assistant text shown when a reply could not be produced
pub const APOLOGY: &str = "Sorry, something went wrong.";

/// Common interface for reply strategies
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce the assistant reply for one user turn
    async fn produce_reply(&self, text: &str) -> Result<String, ResponderError>;

    /// Short strategy name for logs
    fn name(&self) -> &str;
}

/// Logging wrapper for reply strategies
pub struct LoggingResponder {
    inner: Arc<dyn Responder>,
    name: String,
}

impl LoggingResponder {
    pub fn new(inner: Arc<dyn Responder>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl Responder for LoggingResponder {
    async fn produce_reply(&self, text: &str) -> Result<String, ResponderError> {
        let start = std::time::Instant::now();
        let result = self.inner.produce_reply(text).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    strategy = %self.name,
                    duration_ms = %duration.as_millis(),
                    reply_chars = reply.chars().count(),
                    "Reply produced"
                );
            }
            Err(e) => {
                tracing::warn!(
                    strategy = %self.name,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    error = %e.message,
                    "Reply failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the configured strategy, wrapped with logging
pub fn from_config(config: &ChatConfig) -> Result<Arc<dyn Responder>, ResponderError> {
    let inner: Arc<dyn Responder> = match config.responder {
        ResponderKind::Keyword => Arc::new(KeywordResponder::new()),
        ResponderKind::Remote => Arc::new(RemoteResponder::new(
            config.chat_endpoint.clone(),
            config.remote_timeout,
        )?),
    };
    Ok(Arc::new(LoggingResponder::new(inner)))
}
