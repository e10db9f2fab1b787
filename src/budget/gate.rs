//! Completion gate
//!
//! Pure decision function for the analyze action.
//!
//! # Decision Table
//!
//! ```text
//! has block | count vs ceiling          | result
//! ----------+---------------------------+------------------------------------
//! no        | -                         | disabled, "filter and combine first"
//! yes       | count ≥ ceiling           | disabled, "apply stricter filters"
//! yes       | count < ceiling, same sig | enabled, "Re-analyze reviews"
//! yes       | count < ceiling, new sig  | enabled, "Analyze reviews"
//!
//! The ceiling is exclusive: count = ceiling is rejected.
//! ```

use crate::context::format_number;

/// Label for a first analysis of the current filter
pub const ANALYZE_LABEL: &str = "Analyze reviews";

/// Label when the current filter was already analyzed
pub const REANALYZE_LABEL: &str = "Re-analyze reviews";

/// Caption shown before anything was combined
pub const COMBINE_FIRST_CAPTION: &str = "Filter reviews and combine them to enable LLM analysis.";

/// Outcome of a gate evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub enabled: bool,
    pub label: String,
    pub caption: String,
}

impl GateDecision {
    fn disabled(caption: String) -> Self {
        Self {
            enabled: false,
            label: ANALYZE_LABEL.to_string(),
            caption,
        }
    }

    fn enabled(label: &str) -> Self {
        Self {
            enabled: true,
            label: label.to_string(),
            caption: String::new(),
        }
    }

    /// Whether the decision would re-run an existing analysis
    pub fn is_reanalysis(&self) -> bool {
        self.enabled && self.label == REANALYZE_LABEL
    }
}

/// Analyze-action gate
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionGate;

impl CompletionGate {
    /// Decide whether analysis is allowed
    ///
    /// `signature_changed` is true when the live filter signature differs
    /// from the one of the last successful analysis, or when there was none.
    pub fn decide(
        has_block: bool,
        token_count: Option<usize>,
        ceiling: usize,
        signature_changed: bool,
    ) -> GateDecision {
        let count = match (has_block, token_count) {
            (true, Some(count)) => count,
            _ => return GateDecision::disabled(COMBINE_FIRST_CAPTION.to_string()),
        };

        if count >= ceiling {
            return GateDecision::disabled(format!(
                "Combined reviews must have less than {} tokens to enable LLM analysis. Apply stricter filters.",
                format_number(ceiling)
            ));
        }

        if signature_changed {
            GateDecision::enabled(ANALYZE_LABEL)
        } else {
            GateDecision::enabled(REANALYZE_LABEL)
        }
    }
}
