//! Input handler for REPL using rustyline
//!
//! Line editing with persistent history and tab completion of slash
//! commands and model names.

use anyhow::Result;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::path::PathBuf;

/// Prompt shown before every line
pub const PROMPT: &str = ">review-analyzer: ";

/// Commands offered by tab completion
pub const COMMAND_NAMES: &[&str] = &[
    "/analyze",
    "/clear",
    "/combine",
    "/dates",
    "/exit",
    "/help",
    "/model",
    "/prompt",
    "/properties",
    "/property",
    "/ratings",
    "/reset",
    "/result",
    "/reviews",
    "/status",
    "/system",
];

const MODEL_NAMES: &[&str] = &["gpt", "mistral"];

/// One read from the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C; the current line is discarded
    Interrupted,
    /// Ctrl-D
    Eof,
}

/// Completes command names, then model names after `/model`
#[derive(Debug, Default)]
pub struct CommandCompleter;

impl CommandCompleter {
    /// Candidates for `line` up to the cursor, with the replacement start
    pub fn candidates(&self, line: &str) -> (usize, Vec<String>) {
        if let Some(arg) = line.strip_prefix("/model ") {
            let start = line.len() - arg.len();
            let matches = MODEL_NAMES
                .iter()
                .filter(|m| m.starts_with(arg.trim_start()))
                .map(|m| m.to_string())
                .collect();
            return (start, matches);
        }

        if line.starts_with('/') && !line.contains(char::is_whitespace) {
            let matches = COMMAND_NAMES
                .iter()
                .filter(|c| c.starts_with(line))
                .map(|c| c.to_string())
                .collect();
            return (0, matches);
        }

        (line.len(), Vec::new())
    }
}

impl Completer for CommandCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.candidates(&line[..pos]))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/// Input handler managing readline interface and command history
pub struct InputHandler {
    editor: Editor<CommandCompleter, DefaultHistory>,
    history_path: Option<PathBuf>,
    prompt: String,
}

impl InputHandler {
    /// Create new input handler
    pub fn new() -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(CommandCompleter));

        Ok(InputHandler {
            editor,
            history_path: None,
            prompt: PROMPT.to_string(),
        })
    }

    /// Create input handler with persistent history
    pub fn with_history(history_file: PathBuf) -> Result<Self> {
        let mut handler = Self::new()?;
        if history_file.exists() {
            let _ = handler.editor.load_history(&history_file);
        }
        handler.history_path = Some(history_file);
        Ok(handler)
    }

    /// Read a line of input from user
    pub fn read_line(&mut self) -> Result<InputEvent> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(InputEvent::Line(trimmed.to_string()))
            }
            Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
            Err(ReadlineError::Eof) => Ok(InputEvent::Eof),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    /// Save history to disk
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(ref path) = self.history_path {
            self.editor.save_history(path)?;
        }
        Ok(())
    }

}
