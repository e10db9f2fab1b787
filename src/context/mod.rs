//! Token context module
//!
//! Handles model-native token counting for combined review text.

pub mod counter;

// Re-export commonly used types
pub use counter::{format_number, CountTokens, TokenCounter, TokenizerSource};
pub use counter::DEFAULT_MISTRAL_TOKENIZER_REPO;
