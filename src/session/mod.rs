//! Session module
//!
//! One interactive analysis session: filter state, combined reviews, the
//! selected model and prompts, and the last completion.

pub mod analyzer;
pub mod state;

pub use analyzer::{AnalyzerSession, FilterOutcome};
pub use state::{AnalysisResult, SessionSettings, SessionState, DEFAULT_RATINGS};
