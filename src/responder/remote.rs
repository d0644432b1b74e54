//! Remote nutrition-chat endpoint

use super::{Responder, ResponderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.example.com/chat";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

/// Posts the user text and returns the endpoint's `reply` field; no retries
pub struct RemoteResponder {
    client: Client,
    endpoint: String,
}

impl RemoteResponder {
    /// `timeout` of `None` waits for the endpoint indefinitely
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ResponderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ResponderError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> ResponderError {
        if status.is_server_error() {
            ResponderError::server_error(format!("Endpoint error ({status}): {body}"))
        } else {
            ResponderError::invalid_request(format!("Endpoint rejected request ({status}): {body}"))
        }
    }
}

#[async_trait]
impl Responder for RemoteResponder {
    async fn produce_reply(&self, text: &str) -> Result<String, ResponderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message: text })
            .send()
            .await
            .map_err(|e| ResponderError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResponderError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_status(status, &body));
        }

        let parsed: ChatReply = serde_json::from_str(&body)
            .map_err(|e| ResponderError::invalid_response(format!("Unexpected response body: {e}")))?;
        Ok(parsed.reply)
    }

    fn name(&self) -> &str {
        "remote"
    }
}
