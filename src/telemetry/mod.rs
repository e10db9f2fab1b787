//! Telemetry system for Review Analyzer
//!
//! Collects session events (filtering, combining, analysis streaming) and
//! prints a summary when the session ends. Statistics cover the whole
//! session; the event log keeps only the most recent events, and per-chunk
//! events only update the statistics.

use crate::cli::Verbosity;
use crate::models::ModelId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Events kept in the log
pub const MAX_EVENTS: usize = 256;

/// Events listed by the detailed summary
const SUMMARY_EVENTS: usize = 10;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Pipeline events
    FilterApplied {
        matched: usize,
        timestamp: Instant,
    },
    ReviewsCombined {
        reviews: usize,
        tokens: usize,
        model: ModelId,
        timestamp: Instant,
    },
    ModelSwitched {
        from: ModelId,
        to: ModelId,
        timestamp: Instant,
    },

    // Analysis events
    AnalysisStarted {
        model: ModelId,
        timestamp: Instant,
    },
    ChunkReceived {
        chars: usize,
        timestamp: Instant,
    },
    AnalysisCompleted {
        model: ModelId,
        duration_ms: u64,
        success: bool,
        timestamp: Instant,
    },
}

impl TelemetryEvent {
    fn timestamp(&self) -> Instant {
        match self {
            TelemetryEvent::FilterApplied { timestamp, .. }
            | TelemetryEvent::ReviewsCombined { timestamp, .. }
            | TelemetryEvent::ModelSwitched { timestamp, .. }
            | TelemetryEvent::AnalysisStarted { timestamp, .. }
            | TelemetryEvent::ChunkReceived { timestamp, .. }
            | TelemetryEvent::AnalysisCompleted { timestamp, .. } => *timestamp,
        }
    }

    /// One-line description for the session summary
    pub fn describe(&self) -> String {
        match self {
            TelemetryEvent::FilterApplied { matched, .. } => {
                format!("filter applied: {} reviews", matched)
            }
            TelemetryEvent::ReviewsCombined {
                reviews,
                tokens,
                model,
                ..
            } => format!("combined {} reviews: {} tokens ({})", reviews, tokens, model),
            TelemetryEvent::ModelSwitched { from, to, .. } => {
                format!("model switched: {} -> {}", from, to)
            }
            TelemetryEvent::AnalysisStarted { model, .. } => format!("analysis started ({})", model),
            TelemetryEvent::ChunkReceived { chars, .. } => format!("chunk received: {} chars", chars),
            TelemetryEvent::AnalysisCompleted {
                model,
                duration_ms,
                success,
                ..
            } => format!(
                "analysis {} ({}, {}ms)",
                if *success { "completed" } else { "failed" },
                model,
                duration_ms
            ),
        }
    }
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub filters_applied: usize,
    pub combines: usize,
    pub tokens_combined: usize,
    pub model_switches: usize,
    pub analyses_started: usize,
    pub analyses_succeeded: usize,
    pub analyses_failed: usize,
    pub chunks_received: usize,
    pub chars_received: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_EVENTS))),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        // Update stats
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            match &event {
                TelemetryEvent::FilterApplied { .. } => {
                    stats.filters_applied += 1;
                }
                TelemetryEvent::ReviewsCombined { tokens, .. } => {
                    stats.combines += 1;
                    stats.tokens_combined += tokens;
                }
                TelemetryEvent::ModelSwitched { .. } => {
                    stats.model_switches += 1;
                }
                TelemetryEvent::AnalysisStarted { .. } => {
                    stats.analyses_started += 1;
                }
                TelemetryEvent::ChunkReceived { chars, .. } => {
                    stats.chunks_received += 1;
                    stats.chars_received += chars;
                }
                TelemetryEvent::AnalysisCompleted { success, .. } => {
                    if *success {
                        stats.analyses_succeeded += 1;
                    } else {
                        stats.analyses_failed += 1;
                    }
                }
            }
        }

        if matches!(event, TelemetryEvent::ChunkReceived { .. }) {
            return;
        }

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get recent events (last n), oldest first
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Fraction of finished analyses that succeeded
    pub fn analysis_success_rate(&self) -> f64 {
        let stats = self.get_stats();
        let total = stats.analyses_succeeded + stats.analyses_failed;
        if total == 0 {
            1.0
        } else {
            stats.analyses_succeeded as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("\n📊 Session Summary");
        println!("─────────────────────────────────────");
        println!("Duration:          {:?}", elapsed);
        println!("Filters applied:   {}", stats.filters_applied);
        println!("Combines:          {}", stats.combines);
        println!("Analyses:          {}", stats.analyses_started);
        println!("Success rate:      {:.1}%", self.collector.analysis_success_rate() * 100.0);
        if self.verbosity.show_events() {
            println!("Chunks received:   {}", stats.chunks_received);
            println!("Model switches:    {}", stats.model_switches);
            self.display_recent_events();
        }
        println!();
    }

    fn display_recent_events(&self) {
        let events = self.collector.recent_events(SUMMARY_EVENTS);
        if events.is_empty() {
            return;
        }
        println!("Recent events:");
        for event in events {
            let offset = event.timestamp().saturating_duration_since(self.collector.start_time);
            println!("  +{:>7.1}s  {}", offset.as_secs_f64(), event.describe());
        }
    }

    /// Check if should show detailed output
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}
