//! Review analysis pipeline
//!
//! Wires filter → combine → gate → analyze around one [`SessionState`].
//!
//! Flow per user action:
//! - filter change: refilter; combine automatically below the auto-combine
//!   limit, otherwise wait for an explicit combine
//! - combine: concatenate and count with the selected model's tokenizer
//! - model switch: recount the current block with the new tokenizer so the
//!   gate is evaluated against the new ceiling
//! - analyze: only when the gate allows it; stream into the caller's sink

use crate::budget::{CompletionGate, GateDecision};
use crate::context::CountTokens;
use crate::errors::{AnalyzerError, Result};
use crate::models::ModelId;
use crate::prompts::build_user_prompt;
use crate::reviews::{
    filter_reviews, requires_explicit_combine, CombinedReviewBlock, DateRange, FilterCriteria,
    FilterSignature, Review, ReviewCombiner, ReviewTable,
};
use crate::session::state::{AnalysisResult, SessionSettings, SessionState};
use crate::streaming::{ChunkSink, LlmClient};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use std::sync::Arc;
use std::time::Instant;

/// Result of applying a filter change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Rows matching the new criteria
    pub matched: usize,

    /// Whether the matching rows were combined without user action
    pub auto_combined: bool,
}

/// Filtered rows and, when combined automatically, their block
struct FilterUpdate {
    filtered: Vec<Review>,
    block: Option<CombinedReviewBlock>,
}

/// One analysis session over a loaded review table
pub struct AnalyzerSession {
    table: Arc<ReviewTable>,
    counter: Arc<dyn CountTokens>,
    settings: SessionSettings,
    state: SessionState,
    telemetry: TelemetryCollector,
}

impl AnalyzerSession {
    /// Start a session with the default filter applied
    ///
    /// Default filter: first property in the dataset, the configured default
    /// ratings, and the full date span of the dataset.
    pub fn new(
        table: Arc<ReviewTable>,
        counter: Arc<dyn CountTokens>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let criteria = Self::initial_criteria(&table, &settings)?;
        let state = SessionState::new(criteria, &settings);
        let mut session = Self {
            table,
            counter,
            settings,
            state,
            telemetry: TelemetryCollector::new(),
        };
        let update = session.prepare(&session.state.criteria, session.state.model)?;
        session.commit(update);
        Ok(session)
    }

    fn initial_criteria(table: &ReviewTable, settings: &SessionSettings) -> Result<FilterCriteria> {
        let property = table
            .property_names()
            .into_iter()
            .next()
            .ok_or_else(|| AnalyzerError::DatasetError("Dataset contains no reviews".to_string()))?;
        let range = table
            .date_bounds()
            .ok_or_else(|| AnalyzerError::DatasetError("Dataset contains no dates".to_string()))?;
        Ok(FilterCriteria::new(
            property,
            settings.default_ratings.iter().copied(),
            range,
        ))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn table(&self) -> &ReviewTable {
        &self.table
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.state.criteria
    }

    pub fn filtered(&self) -> &[Review] {
        &self.state.filtered
    }

    pub fn combined(&self) -> Option<&CombinedReviewBlock> {
        self.state.combined.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.state.analysis.as_ref()
    }

    pub fn model(&self) -> ModelId {
        self.state.model
    }

    /// Ceiling of the selected model
    pub fn ceiling(&self) -> usize {
        self.settings.ceiling(self.state.model)
    }

    /// Signature of the live filter
    pub fn signature(&self) -> FilterSignature {
        FilterSignature::new(&self.state.criteria, self.state.filtered.len())
    }

    /// Combined block for the live filter, if it is up to date
    pub fn current_block(&self) -> Option<&CombinedReviewBlock> {
        let live = self.signature();
        self.state
            .combined
            .as_ref()
            .filter(|block| *block.signature() == live)
    }

    /// A block exists but was built for a different filter
    pub fn is_block_stale(&self) -> bool {
        self.state.combined.is_some() && self.current_block().is_none()
    }

    /// Whether the live filtered set waits for an explicit combine
    pub fn requires_explicit_combine(&self) -> bool {
        requires_explicit_combine(self.state.filtered.len(), self.settings.auto_combine_limit)
    }

    /// Select a property by exact name
    pub fn set_property(&mut self, name: &str) -> Result<FilterOutcome> {
        let mut criteria = self.state.criteria.clone();
        criteria.property_name = name.to_string();
        self.apply_criteria(criteria)
    }

    /// Replace the accepted ratings
    pub fn set_ratings(&mut self, ratings: impl IntoIterator<Item = i32>) -> Result<FilterOutcome> {
        let mut criteria = self.state.criteria.clone();
        criteria.ratings = ratings.into_iter().collect();
        self.apply_criteria(criteria)
    }

    /// Replace the date range
    pub fn set_date_range(&mut self, range: DateRange) -> Result<FilterOutcome> {
        let mut criteria = self.state.criteria.clone();
        criteria.date_range = range;
        self.apply_criteria(criteria)
    }

    /// Validate and apply new criteria
    ///
    /// Unknown properties and inverted ranges are rejected before anything
    /// changes. A failed automatic combine also leaves the session as it was.
    pub fn apply_criteria(&mut self, criteria: FilterCriteria) -> Result<FilterOutcome> {
        if !self.table.has_property(&criteria.property_name) {
            return Err(AnalyzerError::InvalidInput(format!(
                "Unknown property: {}",
                criteria.property_name
            )));
        }
        if criteria.date_range.is_inverted() {
            return Err(AnalyzerError::InvalidInput(format!(
                "Date range end {} is before start {}",
                criteria.date_range.end, criteria.date_range.start
            )));
        }

        let update = self.prepare(&criteria, self.state.model)?;
        self.state.criteria = criteria;
        Ok(self.commit(update))
    }

    /// Filter and, below the auto-combine limit, combine without touching state
    fn prepare(&self, criteria: &FilterCriteria, model: ModelId) -> Result<FilterUpdate> {
        let filtered = filter_reviews(self.table.reviews(), criteria);
        if requires_explicit_combine(filtered.len(), self.settings.auto_combine_limit) {
            return Ok(FilterUpdate { filtered, block: None });
        }

        let signature = FilterSignature::new(criteria, filtered.len());
        let block = ReviewCombiner::new(self.counter.as_ref()).combine(&filtered, model, signature)?;
        Ok(FilterUpdate {
            filtered,
            block: Some(block),
        })
    }

    /// Store a prepared update; the criteria must already be in place
    fn commit(&mut self, update: FilterUpdate) -> FilterOutcome {
        self.state.filtered = update.filtered;
        let matched = self.state.filtered.len();
        tracing::debug!(matched, "filter applied");
        self.telemetry.record(TelemetryEvent::FilterApplied {
            matched,
            timestamp: Instant::now(),
        });

        let auto_combined = match update.block {
            Some(block) => {
                self.store_block(block);
                true
            }
            None => false,
        };
        FilterOutcome {
            matched,
            auto_combined,
        }
    }

    fn store_block(&mut self, block: CombinedReviewBlock) -> &CombinedReviewBlock {
        self.telemetry.record(TelemetryEvent::ReviewsCombined {
            reviews: block.review_count(),
            tokens: block.token_count(),
            model: block.model(),
            timestamp: Instant::now(),
        });
        self.state.combined.insert(block)
    }

    /// Combine the live filtered set with the selected model's tokenizer
    pub fn combine(&mut self) -> Result<&CombinedReviewBlock> {
        let signature = self.signature();
        let block = ReviewCombiner::new(self.counter.as_ref()).combine(
            &self.state.filtered,
            self.state.model,
            signature,
        )?;
        Ok(self.store_block(block))
    }

    /// Switch the analysis model
    ///
    /// The current block is recounted with the new tokenizer first; if that
    /// fails nothing changes.
    pub fn select_model(&mut self, model: ModelId) -> Result<()> {
        let previous = self.state.model;
        if model == previous {
            return Ok(());
        }

        if let Some(block) = self.state.combined.as_mut() {
            block.retokenize(self.counter.as_ref(), model)?;
        }
        self.state.model = model;

        tracing::info!(from = %previous, to = %model, "model switched");
        self.telemetry.record(TelemetryEvent::ModelSwitched {
            from: previous,
            to: model,
            timestamp: Instant::now(),
        });
        Ok(())
    }

    /// Replace the main prompt
    pub fn set_main_prompt(&mut self, prompt: impl Into<String>) {
        self.state.main_prompt = prompt.into();
    }

    /// Replace the system prompt
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.state.system_prompt = prompt.into();
    }

    /// Evaluate the completion gate for the live state
    pub fn gate(&self) -> GateDecision {
        let block = self.current_block();
        let signature_changed = match &self.state.analysis {
            Some(analysis) => analysis.signature != self.signature(),
            None => true,
        };
        CompletionGate::decide(
            block.is_some(),
            block.map(CombinedReviewBlock::token_count),
            self.ceiling(),
            signature_changed,
        )
    }

    /// Run the selected model over the combined reviews
    ///
    /// Chunks reach `sink` as they stream in. On failure the previous
    /// analysis is kept and the error is returned; there is no retry.
    pub async fn analyze(
        &mut self,
        client: &dyn LlmClient,
        sink: &mut dyn ChunkSink,
    ) -> Result<&AnalysisResult> {
        let decision = self.gate();
        if !decision.enabled {
            return Err(AnalyzerError::InvalidInput(decision.caption));
        }
        if client.model() != self.state.model {
            return Err(AnalyzerError::InvalidInput(format!(
                "Client is for {} but {} is selected",
                client.model(),
                self.state.model
            )));
        }

        let block = self
            .current_block()
            .ok_or_else(|| AnalyzerError::InvalidInput("Combine reviews first".to_string()))?;
        let user_prompt = build_user_prompt(&self.state.main_prompt, block.text());
        let signature = block.signature().clone();
        let system_prompt = self.state.system_prompt.clone();
        let model = self.state.model;

        let telemetry = self.telemetry.clone();
        telemetry.record(TelemetryEvent::AnalysisStarted {
            model,
            timestamp: Instant::now(),
        });
        tracing::info!(model = %model, tokens = block.token_count(), "analysis started");

        let started = Instant::now();
        let mut forward = |chunk: &str| {
            telemetry.record(TelemetryEvent::ChunkReceived {
                chars: chunk.chars().count(),
                timestamp: Instant::now(),
            });
            sink.on_chunk(chunk);
        };
        let result = client.complete(&user_prompt, &system_prompt, &mut forward).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        telemetry.record(TelemetryEvent::AnalysisCompleted {
            model,
            duration_ms,
            success: result.is_ok(),
            timestamp: Instant::now(),
        });

        let completion = match result {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "analysis failed");
                return Err(e);
            }
        };
        tracing::info!(model = %model, duration_ms, chars = completion.len(), "analysis complete");

        Ok(&*self.state.analysis.insert(AnalysisResult {
            completion,
            signature,
            model,
        }))
    }

    /// Clear all session state back to a fresh session
    ///
    /// If the default filter cannot be combined the session is left as is.
    pub fn reset(&mut self) -> Result<()> {
        let criteria = Self::initial_criteria(&self.table, &self.settings)?;
        let state = SessionState::new(criteria, &self.settings);
        let update = self.prepare(&state.criteria, state.model)?;
        self.state = state;
        self.commit(update);
        tracing::info!("session reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{ANALYZE_LABEL, COMBINE_FIRST_CAPTION, REANALYZE_LABEL};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// One token per word; Mistral counts triple
    struct WordCounter;

    impl CountTokens for WordCounter {
        fn count(&self, text: &str, model: ModelId) -> Result<usize> {
            let words = text.split_whitespace().count();
            Ok(match model {
                ModelId::Gpt4Turbo => words,
                ModelId::Mistral7b => words * 3,
            })
        }
    }

    /// Counts words until switched to failing
    #[derive(Default)]
    struct BreakableCounter {
        broken: AtomicBool,
    }

    impl CountTokens for BreakableCounter {
        fn count(&self, text: &str, _model: ModelId) -> Result<usize> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(AnalyzerError::TokenCountError(
                    "tokenizer unavailable".to_string(),
                ));
            }
            Ok(text.split_whitespace().count())
        }
    }

    struct ScriptedClient {
        model: ModelId,
        chunks: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn model(&self) -> ModelId {
            self.model
        }

        async fn complete(
            &self,
            user_prompt: &str,
            _system_prompt: &str,
            sink: &mut dyn ChunkSink,
        ) -> Result<String> {
            assert!(user_prompt.contains("Review data:"));
            if self.fail {
                return Err(AnalyzerError::api("OpenAI", "HTTP 429: quota exceeded"));
            }
            let mut out = String::new();
            for chunk in &self.chunks {
                sink.on_chunk(chunk);
                out.push_str(chunk);
            }
            Ok(out)
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, d).unwrap()
    }

    fn table(savoy_one_star: usize) -> Arc<ReviewTable> {
        let mut reviews = Vec::new();
        for i in 0..savoy_one_star {
            reviews.push(Review {
                index: (reviews.len() + 1) as u32,
                property_name: "The Savoy".to_string(),
                rating: 1,
                review_date: day(1 + (i % 28) as u32),
                title: Some("Bad".to_string()),
                text: Some("cold room".to_string()),
            });
        }
        reviews.push(Review {
            index: (reviews.len() + 1) as u32,
            property_name: "Ridgemount Hotel".to_string(),
            rating: 5,
            review_date: day(15),
            title: None,
            text: None,
        });
        Arc::new(ReviewTable::new(reviews))
    }

    fn session(rows: usize) -> AnalyzerSession {
        AnalyzerSession::new(table(rows), Arc::new(WordCounter), SessionSettings::default()).unwrap()
    }

    fn client(model: ModelId) -> ScriptedClient {
        ScriptedClient {
            model,
            chunks: vec!["Rooms ", "are ", "cold."],
            fail: false,
        }
    }

    #[test]
    fn test_initial_filter_auto_combines() {
        let session = session(3);
        assert_eq!(session.criteria().property_name, "The Savoy");
        assert_eq!(session.filtered().len(), 3);
        assert!(session.current_block().is_some());
        assert_eq!(session.gate().label, ANALYZE_LABEL);
        assert!(session.gate().enabled);
    }

    #[test]
    fn test_49_rows_combine_automatically() {
        let session = session(49);
        assert!(!session.requires_explicit_combine());
        assert_eq!(session.current_block().unwrap().review_count(), 49);
    }

    #[test]
    fn test_50_rows_need_explicit_combine() {
        let mut session = session(50);
        assert!(session.requires_explicit_combine());
        assert!(session.combined().is_none());
        let gate = session.gate();
        assert!(!gate.enabled);
        assert_eq!(gate.caption, COMBINE_FIRST_CAPTION);

        session.combine().unwrap();
        assert!(session.gate().enabled);
    }

    #[test]
    fn test_stale_block_disables_gate() {
        let mut session = session(60);
        session.combine().unwrap();
        assert!(session.gate().enabled);

        // Same 60 rows, new signature, still above the auto-combine limit
        session.set_ratings([1, 2, 3]).unwrap();
        assert!(session.is_block_stale());
        assert!(!session.gate().enabled);
    }

    #[test]
    fn test_empty_filter_yields_empty_block() {
        let mut session = session(3);
        let outcome = session.set_ratings(Vec::<i32>::new()).unwrap();
        assert_eq!(outcome, FilterOutcome { matched: 0, auto_combined: true });
        let block = session.current_block().unwrap();
        assert!(block.is_empty());
        assert_eq!(block.token_count(), 0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut session = session(3);
        let before = session.signature();
        let err = session.set_date_range(DateRange::new(day(20), day(2))).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput(_)));
        assert_eq!(session.signature(), before);
    }

    #[test]
    fn test_unknown_property_rejected() {
        let mut session = session(3);
        assert!(session.set_property("Nowhere Inn").is_err());
        assert_eq!(session.criteria().property_name, "The Savoy");
    }

    #[test]
    fn test_failed_auto_combine_leaves_filter_unchanged() {
        let counter = Arc::new(BreakableCounter::default());
        let mut session =
            AnalyzerSession::new(table(3), counter.clone(), SessionSettings::default()).unwrap();
        let criteria = session.criteria().clone();
        let filtered = session.filtered().to_vec();
        let signature = session.signature();

        counter.broken.store(true, Ordering::SeqCst);
        let err = session.set_ratings([1]).unwrap_err();
        assert!(matches!(err, AnalyzerError::TokenCountError(_)));

        assert_eq!(session.criteria(), &criteria);
        assert_eq!(session.filtered(), filtered.as_slice());
        assert_eq!(session.signature(), signature);
        assert!(session.current_block().is_some());
        assert!(session.gate().enabled);
        assert_eq!(session.telemetry().get_stats().filters_applied, 1);
    }

    #[test]
    fn test_failed_reset_keeps_session() {
        let counter = Arc::new(BreakableCounter::default());
        let mut session =
            AnalyzerSession::new(table(3), counter.clone(), SessionSettings::default()).unwrap();
        session.set_ratings([1]).unwrap();
        session.set_main_prompt("Only count the complaints.");

        counter.broken.store(true, Ordering::SeqCst);
        assert!(session.reset().is_err());
        assert_eq!(session.state().main_prompt(), "Only count the complaints.");
        assert_eq!(session.criteria().ratings.len(), 1);
    }

    #[test]
    fn test_model_switch_reevaluates_gate() {
        // 3 rows × 7 words each under WordCounter
        let settings = SessionSettings {
            gpt_ceiling: 1_000,
            mistral_ceiling: 40,
            ..SessionSettings::default()
        };
        let mut session =
            AnalyzerSession::new(table(3), Arc::new(WordCounter), settings).unwrap();
        let gpt_tokens = session.current_block().unwrap().token_count();
        assert!(session.gate().enabled);

        session.select_model(ModelId::Mistral7b).unwrap();
        let block = session.current_block().unwrap();
        assert_eq!(block.model(), ModelId::Mistral7b);
        assert_eq!(block.token_count(), gpt_tokens * 3);
        assert!(!session.gate().enabled);
        assert!(session.gate().caption.contains("40"));
    }

    #[tokio::test]
    async fn test_analyze_then_reanalyze_label() {
        let mut session = session(3);
        let mut streamed = String::new();
        let mut sink = |chunk: &str| streamed.push_str(chunk);

        let result = session
            .analyze(&client(ModelId::Gpt4Turbo), &mut sink)
            .await
            .unwrap();
        assert_eq!(result.completion, "Rooms are cold.");
        assert_eq!(result.model, ModelId::Gpt4Turbo);
        assert_eq!(streamed, "Rooms are cold.");

        assert_eq!(session.gate().label, REANALYZE_LABEL);

        session.set_ratings([1, 5]).unwrap();
        assert_eq!(session.gate().label, ANALYZE_LABEL);

        session.set_ratings([2, 1]).unwrap();
        assert_eq!(session.gate().label, REANALYZE_LABEL);
    }

    #[tokio::test]
    async fn test_failed_analysis_keeps_previous_result() {
        let mut session = session(3);
        let mut sink = |_: &str| {};
        session.analyze(&client(ModelId::Gpt4Turbo), &mut sink).await.unwrap();
        let before = session.analysis().cloned();

        let failing = ScriptedClient {
            model: ModelId::Gpt4Turbo,
            chunks: vec![],
            fail: true,
        };
        let err = session.analyze(&failing, &mut sink).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::LlmApiError { .. }));
        assert_eq!(session.analysis().cloned(), before);
        assert_eq!(session.telemetry().get_stats().analyses_failed, 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_mismatched_client() {
        let mut session = session(3);
        let mut sink = |_: &str| {};
        let err = session
            .analyze(&client(ModelId::Mistral7b), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut session = session(3);
        let mut sink = |_: &str| {};
        session.set_main_prompt("Only count the complaints.");
        session.select_model(ModelId::Mistral7b).unwrap();
        session.analyze(&client(ModelId::Mistral7b), &mut sink).await.unwrap();

        session.reset().unwrap();
        assert!(session.analysis().is_none());
        assert_eq!(session.model(), ModelId::Gpt4Turbo);
        assert_eq!(session.state().main_prompt(), SessionSettings::default().main_prompt);
        assert_eq!(session.gate().label, ANALYZE_LABEL);
    }
}
