//! Shared-secret access gate
//!
//! The configured password is hashed once with BLAKE3; attempts are hashed
//! and compared through [`blake3::Hash`] equality, which is constant time.
//! Without a configured password the gate is open.

use crate::errors::{AnalyzerError, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};

/// Attempts allowed before giving up
pub const MAX_ATTEMPTS: usize = 3;

/// Password check in front of every entry point
#[derive(Debug, Clone)]
pub struct AccessGate {
    secret: Option<blake3::Hash>,
}

impl AccessGate {
    /// Gate for `password`; `None` or an empty password leaves it open
    pub fn new(password: Option<&str>) -> Self {
        Self {
            secret: password
                .filter(|p| !p.is_empty())
                .map(|p| blake3::hash(p.as_bytes())),
        }
    }

    /// No password configured
    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    /// Check one attempt
    pub fn verify(&self, attempt: &str) -> bool {
        match &self.secret {
            None => true,
            Some(secret) => blake3::hash(attempt.as_bytes()) == *secret,
        }
    }

    /// Prompt on the terminal until the password matches
    pub fn authorize_interactive(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let entered = prompt_password("Password: ")?;
            if self.verify(&entered) {
                tracing::debug!(attempt, "access granted");
                return Ok(());
            }
            eprintln!("Incorrect password");
        }

        tracing::warn!("access denied after {} attempts", MAX_ATTEMPTS);
        Err(AnalyzerError::AccessDenied)
    }
}

/// Read a line without echoing it
pub fn prompt_password(prompt: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    terminal::enable_raw_mode()?;
    let result = read_hidden_line();
    terminal::disable_raw_mode()?;
    writeln!(stderr)?;

    result
}

fn read_hidden_line() -> Result<String> {
    let mut line = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }

        match code {
            KeyCode::Enter => return Ok(line),
            KeyCode::Backspace => {
                line.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(AnalyzerError::AccessDenied);
            }
            KeyCode::Char(c) => line.push(c),
            KeyCode::Esc => return Err(AnalyzerError::AccessDenied),
            _ => {}
        }
    }
}
