//! Streaming completion module
//!
//! Provides the completion client abstraction, its two hosted-model
//! implementations and the incremental SSE parser they share.

pub mod chat;
pub mod client;
pub mod mistral;
pub mod openai;
pub mod parser;

// Re-export commonly used types
pub use client::{
    accumulate_stream, ApiKey, ChunkSink, ClientFactory, EndpointSettings, LlmClient,
    DEFAULT_MISTRAL_URL, DEFAULT_OPENAI_URL, DEFAULT_IDLE_TIMEOUT,
};
pub use mistral::MistralClient;
pub use openai::OpenAiClient;
pub use parser::{SseEvent, SseParser, MAX_BUFFER_SIZE};
