//! Review Analyzer - hotel review filtering and LLM analysis
//!
//! Loads a hotel review dataset, filters it by property, rating and date,
//! combines the matching reviews into one prompt-ready block, checks the
//! block against the selected model's token ceiling and streams a
//! completion from GPT-4 Turbo or Mistral 7B.
//!
//! # Architecture
//!
//! - **reviews**: dataset loading, filtering, combining, filter signatures
//! - **context**: per-model token counting
//! - **budget**: the completion gate
//! - **streaming**: completion clients and the SSE decoder
//! - **session**: the pipeline state machine tying the above together
//! - **repl** / **cli**: interactive and one-shot terminal surfaces

pub mod access;
pub mod budget;
pub mod cli;
pub mod context;
pub mod errors;
pub mod models;
pub mod prompts;
pub mod repl;
pub mod reviews;
pub mod session;
pub mod streaming;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{AnalyzerError, Result};
