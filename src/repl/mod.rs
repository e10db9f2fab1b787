//! REPL (Read-Eval-Print Loop) module for the interactive session
//!
//! Drives one [`AnalyzerSession`] from slash commands: filter, combine,
//! pick a model, edit prompts and stream analyses.

pub mod commands;
pub mod display;
pub mod input;

use crate::cli::Verbosity;
use crate::context::format_number;
use crate::errors::AnalyzerError;
use crate::repl::commands::{is_command, parse, CommandHandler, CommandOutcome};
pub use crate::repl::display::{DisplayManager, StreamPrinter};
use crate::repl::input::{InputEvent, InputHandler};
use crate::session::AnalyzerSession;
use crate::streaming::ClientFactory;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;

/// REPL session coordinator
pub struct ReplSession {
    session: AnalyzerSession,
    clients: ClientFactory,
    input_handler: InputHandler,
    command_handler: CommandHandler,
    display_manager: DisplayManager,
    verbosity: Verbosity,
}

impl ReplSession {
    /// Create new REPL session
    pub fn new(session: AnalyzerSession, clients: ClientFactory, verbosity: Verbosity) -> Result<Self> {
        Ok(Self::with_input(session, clients, verbosity, InputHandler::new()?))
    }

    /// Create REPL session with persistent history
    pub fn with_history(
        session: AnalyzerSession,
        clients: ClientFactory,
        verbosity: Verbosity,
        history_path: PathBuf,
    ) -> Result<Self> {
        let input = InputHandler::with_history(history_path)?;
        Ok(Self::with_input(session, clients, verbosity, input))
    }

    fn with_input(
        session: AnalyzerSession,
        clients: ClientFactory,
        verbosity: Verbosity,
        input_handler: InputHandler,
    ) -> Self {
        ReplSession {
            session,
            clients,
            input_handler,
            command_handler: CommandHandler::new(),
            display_manager: DisplayManager::new().with_details(verbosity.show_tokens()),
            verbosity,
        }
    }

    /// Run until `/exit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        self.display_manager.show_banner(
            env!("CARGO_PKG_VERSION"),
            self.session.model(),
            self.session.table().len(),
        );
        self.display_manager.show_status(&self.session);

        loop {
            match self.input_handler.read_line()? {
                InputEvent::Line(line) => {
                    if !self.handle_input(&line).await? {
                        break;
                    }
                }
                InputEvent::Interrupted => {
                    self.display_manager.show_info("Interrupted. Type /exit to quit.");
                }
                InputEvent::Eof => {
                    self.display_manager.show_goodbye();
                    break;
                }
            }
        }

        self.input_handler.save_history()?;
        Ok(())
    }

    /// Handle one line of input
    ///
    /// Returns true if the session should continue, false to exit
    pub async fn handle_input(&mut self, input: &str) -> Result<bool> {
        if input.trim().is_empty() {
            return Ok(true);
        }

        if !is_command(input) {
            self.display_manager
                .show_warning("Commands start with '/'. Use /prompt <text> to change the main prompt.");
            return Ok(true);
        }

        let command = parse(input);
        tracing::debug!(?command, "command");
        match self
            .command_handler
            .execute(command, &mut self.session, &self.display_manager)?
        {
            CommandOutcome::Continue => Ok(true),
            CommandOutcome::Exit => Ok(false),
            CommandOutcome::Analyze => {
                self.run_analysis().await;
                Ok(true)
            }
        }
    }

    /// Stream one analysis; failures are reported and leave the session usable
    async fn run_analysis(&mut self) {
        let decision = self.session.gate();
        if !decision.enabled {
            self.display_manager.show_warning(&decision.caption);
            return;
        }

        let model = self.session.model();
        let client = match self.clients.client_for(model) {
            Ok(client) => client,
            Err(AnalyzerError::MissingCredentials(var)) => {
                self.display_manager
                    .show_error(&format!("Set {} to analyze with {}.", var, model.display_name()));
                return;
            }
            Err(e) => {
                self.display_manager.show_error(&e.to_string());
                return;
            }
        };

        if decision.is_reanalysis() {
            self.display_manager
                .show_info("This filter was analyzed before; the new result replaces it.");
        }

        println!();
        let spinner = self
            .verbosity
            .show_progress()
            .then(|| self.display_manager.start_waiting(model));
        let mut printer = StreamPrinter::new(spinner);
        let started = Instant::now();

        let outcome = self.session.analyze(client.as_ref(), &mut printer).await;
        printer.finish();

        match outcome {
            Ok(_) => self.display_manager.finish_with_success(
                &completion_message(&decision.label, printer.chars()),
                started.elapsed().as_millis() as u64,
            ),
            Err(e) => {
                println!();
                self.display_manager.show_error(&format!("Analysis aborted: {}", e));
                if self.session.analysis().is_some() {
                    self.display_manager
                        .show_info("The previous result is still available via /result.");
                }
            }
        }
    }

    /// Get the analysis session
    pub fn session(&self) -> &AnalyzerSession {
        &self.session
    }
}

fn completion_message(label: &str, chars: usize) -> String {
    format!("{} complete: {} characters", label, format_number(chars))
}
