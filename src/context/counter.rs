//! Model-native token counting
//!
//! Counts tokens with the exact subword scheme of each target model:
//! - GPT-4 Turbo: `cl100k_base` BPE via tiktoken-rs (bundled, no download)
//! - Mistral 7B: the SentencePiece-derived `tokenizer.json` published on the
//!   Hugging Face hub, loaded through `tokenizers`
//!
//! Both tokenizers are loaded lazily and cached for the life of the counter.
//! Gate thresholds are expressed in native tokens, so there is no
//! character-based fallback.
//!
//! The Mistral repository on the hub is gated: downloading needs an access
//! token, either from `huggingface-cli login` or from `HF_TOKEN`.

use crate::errors::{AnalyzerError, Result};
use crate::models::ModelId;
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tokenizers::Tokenizer;

/// Default Hugging Face repository for the Mistral 7B tokenizer
pub const DEFAULT_MISTRAL_TOKENIZER_REPO: &str = "mistralai/Mistral-7B-v0.1";

/// Environment variable with a Hugging Face access token
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

/// Shared cl100k_base encoder
static CL100K: OnceCell<CoreBPE> = OnceCell::new();

/// Anything that can count tokens for a given model
///
/// The pipeline depends on this seam rather than on [`TokenCounter`]
/// directly so that sessions can be driven without tokenizer downloads.
pub trait CountTokens: Send + Sync {
    /// Count tokens in `text` using `model`'s tokenizer
    fn count(&self, text: &str, model: ModelId) -> Result<usize>;
}

/// Where to obtain the Mistral tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerSource {
    /// Download (or reuse the cached copy) from the hub
    Hub { repo: String },

    /// Load a local `tokenizer.json`
    File(PathBuf),
}

impl Default for TokenizerSource {
    fn default() -> Self {
        TokenizerSource::Hub {
            repo: DEFAULT_MISTRAL_TOKENIZER_REPO.to_string(),
        }
    }
}

/// Token counter backed by the real model tokenizers
#[derive(Debug)]
pub struct TokenCounter {
    mistral_source: TokenizerSource,
    mistral: OnceCell<Arc<Tokenizer>>,
}

impl TokenCounter {
    /// Create counter using the default tokenizer sources
    pub fn new() -> Self {
        Self::with_mistral_source(TokenizerSource::default())
    }

    /// Create counter with a custom Mistral tokenizer source
    pub fn with_mistral_source(source: TokenizerSource) -> Self {
        Self {
            mistral_source: source,
            mistral: OnceCell::new(),
        }
    }

    fn cl100k() -> Result<&'static CoreBPE> {
        CL100K.get_or_try_init(|| {
            tracing::debug!("loading cl100k_base encoder");
            tiktoken_rs::cl100k_base()
                .map_err(|e| AnalyzerError::TokenCountError(format!("cl100k_base: {}", e)))
        })
    }

    fn mistral_tokenizer(&self) -> Result<&Arc<Tokenizer>> {
        self.mistral.get_or_try_init(|| {
            let path = match &self.mistral_source {
                TokenizerSource::File(path) => path.clone(),
                TokenizerSource::Hub { repo } => {
                    tracing::info!(repo = %repo, "fetching Mistral tokenizer");
                    // A cached login token is picked up by the builder itself
                    let token = std::env::var(HF_TOKEN_ENV)
                        .ok()
                        .filter(|t| !t.trim().is_empty());
                    let mut builder = ApiBuilder::new();
                    if token.is_some() {
                        builder = builder.with_token(token);
                    }
                    let api = builder.build().map_err(|e| {
                        AnalyzerError::TokenCountError(format!("Hugging Face hub unavailable: {}", e))
                    })?;
                    api.repo(Repo::new(repo.clone(), RepoType::Model))
                        .get("tokenizer.json")
                        .map_err(|e| hub_download_error(repo, e))?
                }
            };

            let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
                AnalyzerError::TokenCountError(format!(
                    "Failed to load tokenizer {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Ok(Arc::new(tokenizer))
        })
    }
}

fn hub_download_error(repo: &str, cause: impl fmt::Display) -> AnalyzerError {
    AnalyzerError::TokenCountError(format!(
        "Failed to download tokenizer from {}: {}. The repository may be gated: \
         accept its terms on huggingface.co, then run `huggingface-cli login` or set {}; \
         alternatively set models.mistral_tokenizer_path to a local tokenizer.json",
        repo, cause, HF_TOKEN_ENV
    ))
}

impl CountTokens for TokenCounter {
    fn count(&self, text: &str, model: ModelId) -> Result<usize> {
        if text.is_empty() {
            return Ok(0);
        }

        match model {
            ModelId::Gpt4Turbo => Ok(Self::cl100k()?.encode_ordinary(text).len()),
            ModelId::Mistral7b => {
                let encoding = self
                    .mistral_tokenizer()?
                    .encode(text, false)
                    .map_err(|e| AnalyzerError::TokenCountError(e.to_string()))?;
                Ok(encoding.get_ids().len())
            }
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a count with thousands separators, e.g. `50,000`
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
