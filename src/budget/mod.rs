//! Token budget gating
//! Decides whether combined reviews fit the selected model's ceiling

pub mod gate;

pub use gate::{CompletionGate, GateDecision, ANALYZE_LABEL, COMBINE_FIRST_CAPTION, REANALYZE_LABEL};
