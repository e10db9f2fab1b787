//! Type definitions for the two supported completion models
//!
//! Each model carries its hosted API identifier, a display name, the
//! environment variable holding its credentials, and its token ceiling.

use crate::errors::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// GPT-4 Turbo token ceiling for combined reviews
pub const GPT4_TURBO_CEILING: usize = 50_000;

/// Mistral 7B token ceiling for combined reviews
pub const MISTRAL_7B_CEILING: usize = 30_000;

/// Supported analysis models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    /// OpenAI GPT-4 Turbo
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,

    /// Mistral 7B (hosted by Mistral AI)
    #[serde(rename = "mistral-7b")]
    Mistral7b,
}

impl ModelId {
    /// All models, in selector order
    pub const ALL: [ModelId; 2] = [ModelId::Gpt4Turbo, ModelId::Mistral7b];

    /// Model identifier sent on the wire
    pub fn api_name(&self) -> &'static str {
        match self {
            ModelId::Gpt4Turbo => "gpt-4-turbo-preview",
            ModelId::Mistral7b => "open-mistral-7b",
        }
    }

    /// Human-readable name used in results and prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::Gpt4Turbo => "GPT-4-Turbo",
            ModelId::Mistral7b => "Mistral 7B",
        }
    }

    /// Short config/CLI key
    pub fn key(&self) -> &'static str {
        match self {
            ModelId::Gpt4Turbo => "gpt-4-turbo",
            ModelId::Mistral7b => "mistral-7b",
        }
    }

    /// Name of the hosting service
    pub fn service(&self) -> &'static str {
        match self {
            ModelId::Gpt4Turbo => "OpenAI",
            ModelId::Mistral7b => "Mistral",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ModelId::Gpt4Turbo => "OPENAI_API_KEY",
            ModelId::Mistral7b => "MISTRAL_API_KEY",
        }
    }

    /// Built-in token ceiling (exclusive)
    pub fn default_ceiling(&self) -> usize {
        match self {
            ModelId::Gpt4Turbo => GPT4_TURBO_CEILING,
            ModelId::Mistral7b => MISTRAL_7B_CEILING,
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::Gpt4Turbo
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for ModelId {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gpt" | "gpt4" | "gpt-4" | "gpt-4-turbo" | "gpt-4-turbo-preview" | "openai" => {
                Ok(ModelId::Gpt4Turbo)
            }
            "mistral" | "mistral7b" | "mistral-7b" | "mistral 7b" | "open-mistral-7b" => {
                Ok(ModelId::Mistral7b)
            }
            other => Err(AnalyzerError::UnsupportedModel(other.to_string())),
        }
    }
}
