//! Mistral 7B streaming client
//!
//! Endpoint: POST /chat/completions with `stream: true`. Mistral's request
//! also carries `safe_prompt`, which is left off so the system prompt is
//! sent verbatim.

use crate::errors::Result;
use crate::models::ModelId;
use crate::streaming::chat::{ChatEndpoint, ChatMessage};
use crate::streaming::client::{ApiKey, ChunkSink, LlmClient};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Mistral chat request
#[derive(Debug, Clone, Serialize)]
struct MistralChatRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    stream: bool,
    safe_prompt: bool,
}

/// Mistral 7B client
#[derive(Debug, Clone)]
pub struct MistralClient {
    endpoint: ChatEndpoint,
}

impl MistralClient {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint: ChatEndpoint::new("Mistral", base_url, api_key, timeout)?,
        })
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    fn model(&self) -> ModelId {
        ModelId::Mistral7b
    }

    async fn complete(
        &self,
        user_prompt: &str,
        system_prompt: &str,
        sink: &mut dyn ChunkSink,
    ) -> Result<String> {
        let request = MistralChatRequest {
            model: ModelId::Mistral7b.api_name(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            stream: true,
            safe_prompt: false,
        };
        self.endpoint.stream(&request, sink).await
    }
}
