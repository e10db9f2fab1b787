//! Per-session state
//!
//! Holds everything one interactive session knows. Fields are written only
//! by [`AnalyzerSession`](crate::session::AnalyzerSession), one pipeline
//! stage per field:
//! - filter stage: `criteria`, `filtered`
//! - combine stage: `combined`
//! - analyze stage: `analysis`
//! - prompt editing / model selection: `main_prompt`, `system_prompt`, `model`

use crate::models::ModelId;
use crate::prompts::{DEFAULT_MAIN_PROMPT, DEFAULT_SYSTEM_PROMPT};
use crate::reviews::{CombinedReviewBlock, FilterCriteria, FilterSignature, Review, AUTO_COMBINE_LIMIT};

/// Default ratings preselected for a new session
pub const DEFAULT_RATINGS: [i32; 2] = [1, 2];

/// Settings fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub gpt_ceiling: usize,
    pub mistral_ceiling: usize,
    pub auto_combine_limit: usize,
    pub default_model: ModelId,
    pub default_ratings: Vec<i32>,
    pub main_prompt: String,
    pub system_prompt: String,
}

impl SessionSettings {
    /// Token ceiling for `model` (exclusive)
    pub fn ceiling(&self, model: ModelId) -> usize {
        match model {
            ModelId::Gpt4Turbo => self.gpt_ceiling,
            ModelId::Mistral7b => self.mistral_ceiling,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            gpt_ceiling: ModelId::Gpt4Turbo.default_ceiling(),
            mistral_ceiling: ModelId::Mistral7b.default_ceiling(),
            auto_combine_limit: AUTO_COMBINE_LIMIT,
            default_model: ModelId::default(),
            default_ratings: DEFAULT_RATINGS.to_vec(),
            main_prompt: DEFAULT_MAIN_PROMPT.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Last successful completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub completion: String,
    pub signature: FilterSignature,
    pub model: ModelId,
}

impl AnalysisResult {
    /// Completion prefixed with the filter summary and model name
    pub fn display_text(&self) -> String {
        format!(
            "{}\n\nModel: {}\n\n{}",
            self.signature,
            self.model.display_name(),
            self.completion
        )
    }
}

/// Mutable session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) criteria: FilterCriteria,
    pub(crate) filtered: Vec<Review>,
    pub(crate) combined: Option<CombinedReviewBlock>,
    pub(crate) analysis: Option<AnalysisResult>,
    pub(crate) main_prompt: String,
    pub(crate) system_prompt: String,
    pub(crate) model: ModelId,
}

impl SessionState {
    /// Empty state with default prompts and model
    pub(crate) fn new(criteria: FilterCriteria, settings: &SessionSettings) -> Self {
        Self {
            criteria,
            filtered: Vec::new(),
            combined: None,
            analysis: None,
            main_prompt: settings.main_prompt.clone(),
            system_prompt: settings.system_prompt.clone(),
            model: settings.default_model,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn filtered(&self) -> &[Review] {
        &self.filtered
    }

    pub fn combined(&self) -> Option<&CombinedReviewBlock> {
        self.combined.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn main_prompt(&self) -> &str {
        &self.main_prompt
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model(&self) -> ModelId {
        self.model
    }
}
