//! OpenAI GPT-4 Turbo streaming client
//!
//! Endpoint: POST /chat/completions with `stream: true`

use crate::errors::Result;
use crate::models::ModelId;
use crate::streaming::chat::{ChatEndpoint, ChatMessage};
use crate::streaming::client::{ApiKey, ChunkSink, LlmClient};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// OpenAI chat request
#[derive(Debug, Clone, Serialize)]
struct OpenAiChatRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

/// GPT-4 Turbo client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: ChatEndpoint,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        Ok(Self {
            endpoint: ChatEndpoint::new("OpenAI", base_url, api_key, timeout)?,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> ModelId {
        ModelId::Gpt4Turbo
    }

    async fn complete(
        &self,
        user_prompt: &str,
        system_prompt: &str,
        sink: &mut dyn ChunkSink,
    ) -> Result<String> {
        let request = OpenAiChatRequest {
            model: ModelId::Gpt4Turbo.api_name(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            stream: true,
        };
        self.endpoint.stream(&request, sink).await
    }
}
