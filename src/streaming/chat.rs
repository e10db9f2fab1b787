//! Chat-completions plumbing shared by both services
//!
//! Both vendors expose `POST {base}/chat/completions` with bearer auth and
//! stream `choices[0].delta.content` increments as SSE.

use crate::errors::{AnalyzerError, Result};
use crate::streaming::client::{accumulate_stream, ApiKey, ChunkSink};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connect timeout, separate from the idle timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One chat message
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system",
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
        }
    }
}

/// Streamed chunk payload
#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text increment from one event payload
///
/// Returns `None` for role-only, usage-only or empty deltas. An `error`
/// object inside the stream aborts it.
pub fn parse_delta(service: &str, data: &str) -> Result<Option<String>> {
    let payload: ChunkPayload = serde_json::from_str(data).map_err(|e| {
        AnalyzerError::JsonParseError(format!("{} stream event: {}", service, e))
    })?;

    if let Some(error) = payload.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(AnalyzerError::api(service, message));
    }

    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

/// Authenticated chat-completions endpoint
#[derive(Debug, Clone)]
pub struct ChatEndpoint {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    service: &'static str,
    idle_timeout: Duration,
}

impl ChatEndpoint {
    /// `idle_timeout` bounds the wait for the response and for each chunk
    pub fn new(
        service: &'static str,
        base_url: &str,
        api_key: ApiKey,
        idle_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(AnalyzerError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            service,
            idle_timeout,
        })
    }

    /// POST `body` and drain the streamed reply into `sink`
    pub async fn stream<B>(&self, body: &B, sink: &mut dyn ChunkSink) -> Result<String>
    where
        B: Serialize + Sync,
    {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(service = self.service, url = %url, "starting completion stream");

        let request = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header(ACCEPT, "text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send();

        let response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|_| {
                AnalyzerError::api(
                    self.service,
                    format!("No response within {:?}", self.idle_timeout),
                )
            })?
            .map_err(|e| AnalyzerError::api(self.service, format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalyzerError::api(
                self.service,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| AnalyzerError::StreamingError(e.to_string()))
        });

        accumulate_stream(self.service, stream, sink, Some(self.idle_timeout)).await
    }
}
