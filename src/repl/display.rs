//! Display manager for REPL terminal UI
//!
//! Formats session state for the terminal: filter summary, token budget,
//! gate label and caption, streamed completions. A spinner covers the wait
//! between sending a request and the first streamed chunk.

use crate::budget::GateDecision;
use crate::context::format_number;
use crate::models::ModelId;
use crate::prompts::{MAIN_CAPTION, USAGE_CAPTION};
use crate::repl::commands::DEFAULT_REVIEW_LIMIT;
use crate::reviews::{format_review, CombinedReviewBlock, Review, ReviewTable};
use crate::session::{AnalysisResult, AnalyzerSession, FilterOutcome};
use crate::streaming::ChunkSink;
use colored::*;
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Display manager for REPL UI
pub struct DisplayManager {
    update_interval: Duration,
    show_details: bool,
}

impl DisplayManager {
    /// Create new display manager
    pub fn new() -> Self {
        DisplayManager {
            update_interval: Duration::from_millis(100),
            show_details: false,
        }
    }

    /// Also print token counts and timings
    pub fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, model: ModelId, reviews: usize) {
        let width = 64;
        let rule = "=".repeat(width);
        let title = format!("  Review Analyzer {}", version);
        let info = format!(
            "  Model: {} | Reviews loaded: {}",
            model.display_name(),
            format_number(reviews)
        );

        println!("\n{}", rule.cyan());
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", rule.cyan());
        println!("{}\n", MAIN_CAPTION);
        println!(
            "Type {} for commands, {} to quit\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Display help information
    pub fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold().cyan());
        println!("{}", "=".repeat(64).cyan());

        let commands = [
            ("/properties", "List properties with review counts"),
            ("/property <name|number>", "Select a property"),
            ("/ratings [r ...]", "Select ratings (none clears)"),
            ("/dates <start> <end>", "Select an inclusive date range"),
            ("/reviews [n]", "Show the first n filtered reviews"),
            ("/combine", "Combine filtered reviews and count tokens"),
            ("/model <gpt|mistral>", "Select the analysis model"),
            ("/prompt [text]", "Show or replace the main prompt"),
            ("/system [text]", "Show or replace the system prompt"),
            ("/analyze", "Run the analysis and stream the result"),
            ("/result", "Show the last analysis again"),
            ("/status", "Show filter, token budget and gate"),
            ("/reset", "Restore defaults and clear results"),
            ("/clear, /cls", "Clear screen"),
            ("/exit, /quit, /q", "Exit"),
        ];

        for (cmd, desc) in commands {
            println!("  {:<26} {}", cmd.green(), desc);
        }

        println!("\n{}", "Usage:".bold());
        println!("{}", USAGE_CAPTION);
        println!();
    }

    /// List properties, marking the selected one
    pub fn show_properties(&self, table: &ReviewTable, selected: &str) {
        println!("\n{}", "Properties:".bold().cyan());
        for (i, (name, count)) in table.property_counts().iter().enumerate() {
            let marker = if name == selected { "*".green() } else { " ".normal() };
            println!(
                " {} {:>3}. {} {}",
                marker,
                i + 1,
                name,
                format!("({} reviews)", format_number(*count)).dimmed()
            );
        }
        println!();
    }

    /// Report a filter change
    pub fn show_filter_outcome(&self, session: &AnalyzerSession, outcome: FilterOutcome) {
        println!(
            "{} {} matching reviews",
            "→".cyan(),
            format_number(outcome.matched).bold()
        );
        if outcome.auto_combined {
            if let Some(block) = session.current_block() {
                self.show_combined(block);
            }
        } else {
            self.show_warning(&format!(
                "{} or more reviews match; run /combine to combine them.",
                session.settings().auto_combine_limit
            ));
        }
        self.show_gate(session);
    }

    /// Report a freshly combined block
    pub fn show_combined(&self, block: &CombinedReviewBlock) {
        println!(
            "{} Combined {} reviews: {} tokens ({})",
            "✓".green(),
            format_number(block.review_count()),
            format_number(block.token_count()).bold(),
            block.model().display_name()
        );
        if self.show_details {
            println!("  {}", format!("{} characters", format_number(block.text().len())).dimmed());
        }
    }

    /// Show the gate label and, when disabled, its caption
    pub fn show_gate(&self, session: &AnalyzerSession) {
        let decision = session.gate();
        println!("{}", Self::format_gate(&decision));
    }

    fn format_gate(decision: &GateDecision) -> String {
        if decision.enabled {
            format!("{} [{}] via /analyze", "●".green(), decision.label.green().bold())
        } else {
            format!(
                "{} [{}] {}",
                "○".red(),
                decision.label.dimmed(),
                decision.caption.yellow()
            )
        }
    }

    /// Display session status
    pub fn show_status(&self, session: &AnalyzerSession) {
        println!("\n{}", "Session Status:".bold().cyan());
        println!("{}", "=".repeat(64).cyan());

        println!("  {}", session.signature().as_str());
        println!(
            "  Model:   {} (ceiling {} tokens)",
            session.model().display_name(),
            format_number(session.ceiling())
        );

        match session.current_block() {
            Some(block) => println!(
                "  Tokens:  {} in {} combined reviews",
                format_number(block.token_count()),
                format_number(block.review_count())
            ),
            None if session.is_block_stale() => println!(
                "  Tokens:  {}",
                "filter changed since last combine; run /combine".yellow()
            ),
            None if session.requires_explicit_combine() => println!(
                "  Tokens:  {}",
                format!(
                    "{} reviews wait for /combine",
                    format_number(session.filtered().len())
                )
                .yellow()
            ),
            None => println!("  Tokens:  {}", "not combined yet; run /combine".yellow()),
        }

        match session.analysis() {
            Some(result) => println!(
                "  Result:  {} ({})",
                "available via /result".green(),
                result.model.display_name()
            ),
            None => println!("  Result:  {}", "none".dimmed()),
        }

        println!("  {}", Self::format_gate(&session.gate()));
        println!();
    }

    /// Print the first `limit` filtered reviews
    pub fn show_reviews(&self, reviews: &[Review], limit: usize) {
        if reviews.is_empty() {
            self.show_warning("No reviews match the current filter.");
            return;
        }

        let limit = if limit == 0 { DEFAULT_REVIEW_LIMIT } else { limit };
        println!();
        for review in reviews.iter().take(limit) {
            println!(
                "{}",
                format!("{} | rating {} | {}", review.property_name, review.rating, review.review_date)
                    .dimmed()
            );
            print!("{}", format_review(review));
        }
        if reviews.len() > limit {
            println!(
                "{}",
                format!("... {} more", format_number(reviews.len() - limit)).dimmed()
            );
        }
    }

    /// Show a prompt's current text
    pub fn show_prompt_text(&self, label: &str, text: &str) {
        println!("\n{}", format!("{}:", label).bold().cyan());
        println!("{}\n", text);
    }

    /// Print a stored analysis
    pub fn show_analysis(&self, result: &AnalysisResult) {
        println!();
        println!("{}", result.display_text());
        println!();
    }

    /// Spinner shown until the first chunk arrives
    pub fn start_waiting(&self, model: ModelId) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Waiting for {}...", model.display_name()));
        pb.enable_steady_tick(self.update_interval);
        pb
    }

    /// Finish a streamed analysis
    pub fn finish_with_success(&self, message: &str, duration_ms: u64) {
        println!();
        println!(
            "{} {} {}",
            "✓".green(),
            message,
            format!("({})", format_duration(duration_ms)).dimmed()
        );
    }

    /// Display error message
    pub fn show_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    /// Display warning message
    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    /// Display info message
    pub fn show_info(&self, info: &str) {
        println!("{} {}", "Info:".cyan(), info);
    }

    pub fn show_unknown(&self, input: &str) {
        println!("{}", format!("Unknown command: {}", input).red());
        println!("Type {} for available commands", "/help".cyan());
    }

    pub fn show_goodbye(&self) {
        println!("{}", "Goodbye!".green());
    }

    /// Clear screen
    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints streamed chunks, clearing the spinner on the first one
pub struct StreamPrinter {
    spinner: Option<ProgressBar>,
    chars: usize,
}

impl StreamPrinter {
    pub fn new(spinner: Option<ProgressBar>) -> Self {
        Self { spinner, chars: 0 }
    }

    /// Characters printed so far
    pub fn chars(&self) -> usize {
        self.chars
    }

    /// Clear the spinner if no chunk ever arrived
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl ChunkSink for StreamPrinter {
    fn on_chunk(&mut self, chunk: &str) {
        self.finish();
        self.chars += chunk.chars().count();
        print!("{}", chunk);
        let _ = io::stdout().flush();
    }
}

fn format_duration(duration_ms: u64) -> String {
    if duration_ms > 1000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{ANALYZE_LABEL, COMBINE_FIRST_CAPTION};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(2500), "2.5s");
    }

    #[test]
    fn test_format_gate_disabled_shows_caption() {
        colored::control::set_override(false);
        let decision = GateDecision {
            enabled: false,
            label: ANALYZE_LABEL.to_string(),
            caption: COMBINE_FIRST_CAPTION.to_string(),
        };
        let line = DisplayManager::format_gate(&decision);
        assert!(line.contains(ANALYZE_LABEL));
        assert!(line.contains(COMBINE_FIRST_CAPTION));
    }

    #[test]
    fn test_stream_printer_counts_chars() {
        let mut printer = StreamPrinter::new(None);
        printer.on_chunk("Zimmer ");
        printer.on_chunk("kalt");
        assert_eq!(printer.chars(), 11);
    }
}
