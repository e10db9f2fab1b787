//! Completion model catalogue
//!
//! The analyzer supports exactly two hosted models; everything model-specific
//! (wire name, credentials, ceiling) hangs off [`ModelId`].

pub mod types;

pub use types::{ModelId, GPT4_TURBO_CEILING, MISTRAL_7B_CEILING};
