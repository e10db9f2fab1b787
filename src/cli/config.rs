//! Configuration management for Review Analyzer
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.review-analyzer/config.toml

use crate::context::{TokenizerSource, DEFAULT_MISTRAL_TOKENIZER_REPO};
use crate::errors::{AnalyzerError, Result};
use crate::models::{ModelId, GPT4_TURBO_CEILING, MISTRAL_7B_CEILING};
use crate::prompts::{DEFAULT_MAIN_PROMPT, DEFAULT_SYSTEM_PROMPT};
use crate::reviews::AUTO_COMBINE_LIMIT;
use crate::session::{SessionSettings, DEFAULT_RATINGS};
use crate::streaming::{
    ApiKey, ClientFactory, EndpointSettings, DEFAULT_IDLE_TIMEOUT, DEFAULT_MISTRAL_URL,
    DEFAULT_OPENAI_URL,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the access password
pub const PASSWORD_ENV: &str = "REVIEW_ANALYZER_PASSWORD";

/// Complete configuration for Review Analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub models: ModelsConfig,
    pub endpoints: EndpointsConfig,
    pub prompts: PromptsConfig,
    pub filters: FiltersConfig,
    pub access: AccessConfig,
    pub telemetry: TelemetryConfig,
}

/// Review dataset location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: String,
}

/// Model selection and token ceilings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub default: ModelId,
    pub gpt_ceiling: usize,
    pub mistral_ceiling: usize,
    pub mistral_tokenizer_repo: String,

    /// Local `tokenizer.json`; takes precedence over the hub repo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistral_tokenizer_path: Option<String>,
}

/// Completion endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub openai_base_url: String,
    pub mistral_base_url: String,
    pub timeout_secs: u64,

    /// Used when `OPENAI_API_KEY` is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Used when `MISTRAL_API_KEY` is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistral_api_key: Option<String>,
}

/// Session prompt defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub main: String,
    pub system: String,
}

/// Initial filter and combine behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    pub default_ratings: Vec<i32>,
    pub auto_combine_limit: usize,
}

/// Shared-secret access control
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Telemetry display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub color_output: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data/London_hotel_reviews.csv".to_string(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: ModelId::default(),
            gpt_ceiling: GPT4_TURBO_CEILING,
            mistral_ceiling: MISTRAL_7B_CEILING,
            mistral_tokenizer_repo: DEFAULT_MISTRAL_TOKENIZER_REPO.to_string(),
            mistral_tokenizer_path: None,
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_URL.to_string(),
            mistral_base_url: DEFAULT_MISTRAL_URL.to_string(),
            timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
            openai_api_key: None,
            mistral_api_key: None,
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            main: DEFAULT_MAIN_PROMPT.to_string(),
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            default_ratings: DEFAULT_RATINGS.to_vec(),
            auto_combine_limit: AUTO_COMBINE_LIMIT,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            color_output: true,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AnalyzerError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AnalyzerError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".review-analyzer").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.models.gpt_ceiling == 0 || self.models.mistral_ceiling == 0 {
            return Err(AnalyzerError::ConfigError(
                "Token ceilings must be greater than 0".to_string(),
            ));
        }

        if self.filters.default_ratings.is_empty() {
            return Err(AnalyzerError::ConfigError(
                "default_ratings must not be empty".to_string(),
            ));
        }

        if self.filters.auto_combine_limit == 0 {
            return Err(AnalyzerError::ConfigError(
                "auto_combine_limit must be greater than 0".to_string(),
            ));
        }

        if self.endpoints.timeout_secs == 0 {
            return Err(AnalyzerError::ConfigError(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            _ => {
                return Err(AnalyzerError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    self.telemetry.default_verbosity
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AnalyzerError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AnalyzerError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AnalyzerError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Dataset path with tilde expanded
    pub fn dataset_path(&self) -> PathBuf {
        Self::expand_path(&self.dataset.path)
    }

    /// Access password: environment first, then config; blank means none
    pub fn access_password(&self) -> Option<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .or_else(|| self.access.password.clone())
            .filter(|p| !p.is_empty())
    }

    /// API key for `model`: environment first, then config
    pub fn api_key(&self, model: ModelId) -> Option<ApiKey> {
        let configured = match model {
            ModelId::Gpt4Turbo => &self.endpoints.openai_api_key,
            ModelId::Mistral7b => &self.endpoints.mistral_api_key,
        };
        ApiKey::from_env(model).or_else(|| {
            configured
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ApiKey::new)
        })
    }

    /// Client factory with every available key
    pub fn client_factory(&self) -> ClientFactory {
        ModelId::ALL
            .iter()
            .fold(ClientFactory::new(self.endpoint_settings()), |factory, &model| {
                match self.api_key(model) {
                    Some(key) => factory.with_key(model, key),
                    None => factory,
                }
            })
    }

    /// Settings for a new analysis session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            gpt_ceiling: self.models.gpt_ceiling,
            mistral_ceiling: self.models.mistral_ceiling,
            auto_combine_limit: self.filters.auto_combine_limit,
            default_model: self.models.default,
            default_ratings: self.filters.default_ratings.clone(),
            main_prompt: self.prompts.main.clone(),
            system_prompt: self.prompts.system.clone(),
        }
    }

    /// Endpoint locations for the completion clients
    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings {
            openai_base_url: self.endpoints.openai_base_url.clone(),
            mistral_base_url: self.endpoints.mistral_base_url.clone(),
            timeout: Duration::from_secs(self.endpoints.timeout_secs),
        }
    }

    /// Where the Mistral tokenizer comes from
    pub fn tokenizer_source(&self) -> TokenizerSource {
        match &self.models.mistral_tokenizer_path {
            Some(path) => TokenizerSource::File(Self::expand_path(path)),
            None => TokenizerSource::Hub {
                repo: self.models.mistral_tokenizer_repo.clone(),
            },
        }
    }
}
