//! Completion client abstraction
//!
//! One capability, [`LlmClient`], with one implementation per hosted model.
//! Callers select an implementation by [`ModelId`] through
//! [`ClientFactory`] and never branch on the vendor themselves.
//!
//! Completions are streamed: every partial chunk is handed to a caller
//! supplied [`ChunkSink`] in arrival order before the assembled text is
//! returned.

use crate::errors::{AnalyzerError, Result};
use crate::models::ModelId;
use crate::streaming::chat::parse_delta;
use crate::streaming::mistral::MistralClient;
use crate::streaming::openai::OpenAiClient;
use crate::streaming::parser::{SseEvent, SseParser};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::fmt;
use std::time::Duration;

/// Default OpenAI API base URL
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default Mistral API base URL
pub const DEFAULT_MISTRAL_URL: &str = "https://api.mistral.ai/v1";

/// Default limit on waiting for the response or for the next chunk
///
/// The stream as a whole is never timed out: a long completion runs as
/// long as chunks keep arriving.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Receiver of partial completion text
pub trait ChunkSink: Send {
    fn on_chunk(&mut self, chunk: &str);
}

impl<F> ChunkSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_chunk(&mut self, chunk: &str) {
        self(chunk)
    }
}

/// Streaming completion capability
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model this client talks to
    fn model(&self) -> ModelId;

    /// Stream a completion, feeding `sink`, and return the full text
    ///
    /// Fails on authentication, quota, transport errors and on streams that
    /// end without the terminator. Never retries.
    async fn complete(
        &self,
        user_prompt: &str,
        system_prompt: &str,
        sink: &mut dyn ChunkSink,
    ) -> Result<String>;
}

/// API key; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    /// Read from the model's environment variable, ignoring blank values
    pub fn from_env(model: ModelId) -> Option<Self> {
        std::env::var(model.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(ApiKey)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Endpoint locations and limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub openai_base_url: String,
    pub mistral_base_url: String,
    /// Idle limit per wait, not a total request deadline
    pub timeout: Duration,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_URL.to_string(),
            mistral_base_url: DEFAULT_MISTRAL_URL.to_string(),
            timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Selects the [`LlmClient`] implementation for a model
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    endpoints: EndpointSettings,
    openai_key: Option<ApiKey>,
    mistral_key: Option<ApiKey>,
}

impl ClientFactory {
    pub fn new(endpoints: EndpointSettings) -> Self {
        Self {
            endpoints,
            openai_key: None,
            mistral_key: None,
        }
    }

    /// Set the key for a model's service
    pub fn with_key(mut self, model: ModelId, key: ApiKey) -> Self {
        match model {
            ModelId::Gpt4Turbo => self.openai_key = Some(key),
            ModelId::Mistral7b => self.mistral_key = Some(key),
        }
        self
    }

    /// Whether a key is available for `model`
    pub fn has_key(&self, model: ModelId) -> bool {
        self.key(model).is_some()
    }

    fn key(&self, model: ModelId) -> Option<&ApiKey> {
        match model {
            ModelId::Gpt4Turbo => self.openai_key.as_ref(),
            ModelId::Mistral7b => self.mistral_key.as_ref(),
        }
    }

    /// Build the client for `model`
    pub fn client_for(&self, model: ModelId) -> Result<Box<dyn LlmClient>> {
        let key = self
            .key(model)
            .cloned()
            .ok_or_else(|| AnalyzerError::MissingCredentials(model.api_key_env().to_string()))?;

        Ok(match model {
            ModelId::Gpt4Turbo => Box::new(OpenAiClient::new(
                &self.endpoints.openai_base_url,
                key,
                self.endpoints.timeout,
            )?),
            ModelId::Mistral7b => Box::new(MistralClient::new(
                &self.endpoints.mistral_base_url,
                key,
                self.endpoints.timeout,
            )?),
        })
    }
}

/// Drain an SSE byte stream into the final completion text
///
/// Each non-empty delta reaches `sink` before it is appended. The stream
/// must close with `[DONE]`; anything else is an abnormal termination.
/// With `idle_timeout` set, a gap between chunks longer than the limit
/// aborts the stream.
pub async fn accumulate_stream<S>(
    service: &str,
    stream: S,
    sink: &mut dyn ChunkSink,
    idle_timeout: Option<Duration>,
) -> Result<String>
where
    S: Stream<Item = Result<Bytes>>,
{
    futures_util::pin_mut!(stream);

    let mut parser = SseParser::new();
    let mut response = String::new();
    let mut chunks = 0usize;

    loop {
        let next = match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next()).await.map_err(|_| {
                AnalyzerError::StreamingError(format!(
                    "{} stream stalled: no data for {:?} after {} chunks",
                    service,
                    limit,
                    chunks
                ))
            })?,
            None => stream.next().await,
        };
        let Some(bytes) = next else {
            break;
        };
        let events = parser.add_bytes(&bytes?)?;
        if apply_events(service, events, sink, &mut response, &mut chunks)? {
            tracing::debug!(service, chunks, chars = response.len(), "stream complete");
            return Ok(response);
        }
    }

    let trailing = parser.finish();
    if apply_events(service, trailing, sink, &mut response, &mut chunks)? {
        return Ok(response);
    }

    Err(AnalyzerError::StreamingError(format!(
        "{} stream ended before completion after {} chunks",
        service, chunks
    )))
}

/// Returns true once the terminator was seen
fn apply_events(
    service: &str,
    events: Vec<SseEvent>,
    sink: &mut dyn ChunkSink,
    response: &mut String,
    chunks: &mut usize,
) -> Result<bool> {
    for event in events {
        match event {
            SseEvent::Done => return Ok(true),
            SseEvent::Data(data) => {
                if let Some(delta) = parse_delta(service, &data)? {
                    *chunks += 1;
                    sink.on_chunk(&delta);
                    response.push_str(&delta);
                }
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn byte_stream(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    #[tokio::test]
    async fn test_accumulates_in_order() {
        let parts = vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        ];
        let mut seen = Vec::new();
        let mut sink = |chunk: &str| seen.push(chunk.to_string());
        let text = accumulate_stream("OpenAI", byte_stream(parts), &mut sink, None).await.unwrap();
        assert_eq!(text, "Hello");
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_missing_terminator_is_error() {
        let parts = vec!["data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n"];
        let mut sink = |_: &str| {};
        let err = accumulate_stream("OpenAI", byte_stream(parts), &mut sink, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::StreamingError(_)));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let parts: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n")),
            Err(AnalyzerError::StreamingError("connection reset".to_string())),
        ];
        let mut sink = |_: &str| {};
        let err = accumulate_stream("Mistral", stream::iter(parts), &mut sink, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_idle_stream_times_out() {
        let first = stream::iter(vec![Ok(Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Zimmer\"}}]}\n\n",
        ))]);
        let stalled = first.chain(stream::pending());
        let mut seen = String::new();
        let mut sink = |chunk: &str| seen.push_str(chunk);

        let err = accumulate_stream("OpenAI", stalled, &mut sink, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::StreamingError(ref m) if m.contains("stalled")));
        assert_eq!(seen, "Zimmer");
    }

    #[tokio::test]
    async fn test_slow_stream_within_idle_limit_completes() {
        let parts = vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
            "data: [DONE]\n\n",
        ];
        // Total time exceeds the idle limit; each gap does not
        let slow = byte_stream(parts).then(|part| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            part
        });
        let mut sink = |_: &str| {};
        let text = accumulate_stream("Mistral", slow, &mut sink, Some(Duration::from_millis(60)))
            .await
            .unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_factory_requires_key() {
        let factory = ClientFactory::default();
        assert!(!factory.has_key(ModelId::Mistral7b));
        let err = factory.client_for(ModelId::Mistral7b).err().unwrap();
        assert!(matches!(err, AnalyzerError::MissingCredentials(ref var) if var == "MISTRAL_API_KEY"));
    }

    #[test]
    fn test_factory_selects_by_model() {
        let factory = ClientFactory::default()
            .with_key(ModelId::Gpt4Turbo, ApiKey::new("sk-test"))
            .with_key(ModelId::Mistral7b, ApiKey::new("ms-test"));
        assert_eq!(factory.client_for(ModelId::Gpt4Turbo).unwrap().model(), ModelId::Gpt4Turbo);
        assert_eq!(factory.client_for(ModelId::Mistral7b).unwrap().model(), ModelId::Mistral7b);
    }

    #[test]
    fn test_api_key_debug_redacted() {
        let key = ApiKey::new("sk-secret");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
    }
}
