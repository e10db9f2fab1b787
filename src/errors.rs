//! Error types for Review Analyzer
//!
//! Provides a single error enum for the library with context propagation.
//! Binaries wrap it in `anyhow` at the top level.

use thiserror::Error;

/// Main error type for the review analysis pipeline
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Token counting errors (tokenizer load or encode failure)
    #[error("Token counting failed: {0}")]
    TokenCountError(String),

    /// Model identifier not recognized
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Dataset loading errors
    #[error("Dataset error: {0}")]
    DatasetError(String),

    /// CSV decoding errors
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// User input rejected before any processing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Streaming errors (transport failure or abnormal termination)
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// Malformed event payload
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// Remote completion service rejected the request
    #[error("{service} API error: {message}")]
    LlmApiError { service: String, message: String },

    /// No API key available for the selected service
    #[error("Missing credentials: set {0} or configure the key in the config file")]
    MissingCredentials(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Shared-secret check failed
    #[error("Access denied: password incorrect")]
    AccessDenied,
}

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

impl AnalyzerError {
    /// Build an API error tagged with the service name
    pub fn api(service: &str, message: impl Into<String>) -> Self {
        AnalyzerError::LlmApiError {
            service: service.to_string(),
            message: message.into(),
        }
    }
}
