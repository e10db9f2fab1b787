//! Command handler for REPL built-in commands
//!
//! Every user action in the interactive session is a slash command. Parsing
//! is pure; execution mutates the [`AnalyzerSession`] and prints through the
//! [`DisplayManager`]. `/analyze` is handed back to the caller because it
//! streams over the network.

use crate::models::ModelId;
use crate::repl::display::DisplayManager;
use crate::reviews::{parse_date, DateRange, ReviewTable};
use crate::session::AnalyzerSession;
use anyhow::Result;
use chrono::NaiveDate;

/// Reviews listed by `/reviews` without an explicit limit
pub const DEFAULT_REVIEW_LIMIT: usize = 10;

/// REPL command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Properties,
    Property { selector: String },
    Ratings { ratings: Vec<i32> },
    Dates { start: NaiveDate, end: NaiveDate },
    Model { model: ModelId },
    Prompt { text: Option<String> },
    System { text: Option<String> },
    Combine,
    Analyze,
    Reviews { limit: usize },
    Result,
    Status,
    Reset,
    Clear,
    Exit,
    /// Known command with bad arguments
    Invalid { message: String },
    Unknown { input: String },
}

/// What the REPL loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Analyze,
    Exit,
}

/// Check whether input is a slash command
pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

/// Parse input string into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let Some(body) = trimmed.strip_prefix('/') else {
        return Command::Unknown {
            input: input.to_string(),
        };
    };

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    match name.to_lowercase().as_str() {
        "help" | "h" => Command::Help,
        "exit" | "quit" | "q" => Command::Exit,
        "properties" | "props" => Command::Properties,
        "property" | "prop" => {
            if rest.is_empty() {
                invalid("Usage: /property <name|number>")
            } else {
                Command::Property {
                    selector: rest.to_string(),
                }
            }
        }
        "ratings" => parse_ratings(rest),
        "dates" => parse_dates(rest),
        "model" => match rest.parse::<ModelId>() {
            Ok(model) => Command::Model { model },
            Err(_) => invalid("Usage: /model <gpt|mistral>"),
        },
        "prompt" => Command::Prompt {
            text: non_empty(rest),
        },
        "system" => Command::System {
            text: non_empty(rest),
        },
        "combine" => Command::Combine,
        "analyze" | "analyse" => Command::Analyze,
        "reviews" => {
            if rest.is_empty() {
                Command::Reviews {
                    limit: DEFAULT_REVIEW_LIMIT,
                }
            } else {
                match rest.parse::<usize>() {
                    Ok(limit) => Command::Reviews { limit },
                    Err(_) => invalid("Usage: /reviews [count]"),
                }
            }
        }
        "result" => Command::Result,
        "status" => Command::Status,
        "reset" => Command::Reset,
        "clear" | "cls" => Command::Clear,
        _ => Command::Unknown {
            input: input.to_string(),
        },
    }
}

fn invalid(message: &str) -> Command {
    Command::Invalid {
        message: message.to_string(),
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Ratings separated by spaces or commas; none clears the selection
fn parse_ratings(rest: &str) -> Command {
    let parsed: std::result::Result<Vec<i32>, _> = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse::<i32>)
        .collect();

    match parsed {
        Ok(ratings) => Command::Ratings { ratings },
        Err(_) => invalid("Ratings must be whole numbers, e.g. /ratings 1 2"),
    }
}

fn parse_dates(rest: &str) -> Command {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let [start, end] = parts.as_slice() else {
        return invalid("Usage: /dates <start> <end> (YYYY-MM-DD or M/D/YYYY)");
    };

    match (parse_date(start), parse_date(end)) {
        (Some(start), Some(end)) => Command::Dates { start, end },
        (None, _) => invalid(&format!("Invalid start date: {}", start)),
        (_, None) => invalid(&format!("Invalid end date: {}", end)),
    }
}

/// Resolve a property by 1-based number or case-insensitive name
pub fn resolve_property(table: &ReviewTable, selector: &str) -> Option<String> {
    let names = table.property_names();
    if let Ok(number) = selector.parse::<usize>() {
        if let Some(name) = number.checked_sub(1).and_then(|i| names.get(i)) {
            return Some(name.clone());
        }
    }
    names
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(selector))
}

/// Executes parsed commands against the session
#[derive(Debug, Default)]
pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        CommandHandler
    }

    /// Execute a command
    ///
    /// User mistakes are printed and the session is left unchanged; only
    /// terminal failures are returned as errors.
    pub fn execute(
        &mut self,
        command: Command,
        session: &mut AnalyzerSession,
        display: &DisplayManager,
    ) -> Result<CommandOutcome> {
        match command {
            Command::Help => display.show_help(),
            Command::Exit => {
                display.show_goodbye();
                return Ok(CommandOutcome::Exit);
            }
            Command::Analyze => return Ok(CommandOutcome::Analyze),
            Command::Properties => {
                display.show_properties(session.table(), &session.criteria().property_name)
            }
            Command::Property { selector } => match resolve_property(session.table(), &selector) {
                Some(name) => match session.set_property(&name) {
                    Ok(outcome) => display.show_filter_outcome(session, outcome),
                    Err(e) => display.show_error(&e.to_string()),
                },
                None => display.show_error(&format!(
                    "No property matches '{}'. Use /properties to list them.",
                    selector
                )),
            },
            Command::Ratings { ratings } => match session.set_ratings(ratings) {
                Ok(outcome) => display.show_filter_outcome(session, outcome),
                Err(e) => display.show_error(&e.to_string()),
            },
            Command::Dates { start, end } => match session.set_date_range(DateRange::new(start, end)) {
                Ok(outcome) => display.show_filter_outcome(session, outcome),
                Err(e) => display.show_error(&e.to_string()),
            },
            Command::Model { model } => match session.select_model(model) {
                Ok(()) => {
                    display.show_info(&format!("Model: {}", model.display_name()));
                    display.show_gate(session);
                }
                Err(e) => display.show_error(&e.to_string()),
            },
            Command::Prompt { text: None } => {
                display.show_prompt_text("Main prompt", session.state().main_prompt())
            }
            Command::Prompt { text: Some(text) } => {
                session.set_main_prompt(text);
                display.show_info("Main prompt updated");
            }
            Command::System { text: None } => {
                display.show_prompt_text("System prompt", session.state().system_prompt())
            }
            Command::System { text: Some(text) } => {
                session.set_system_prompt(text);
                display.show_info("System prompt updated");
            }
            Command::Combine => match session.combine() {
                Ok(block) => {
                    display.show_combined(block);
                    display.show_gate(session);
                }
                Err(e) => display.show_error(&e.to_string()),
            },
            Command::Reviews { limit } => display.show_reviews(session.filtered(), limit),
            Command::Result => match session.analysis() {
                Some(result) => display.show_analysis(result),
                None => display.show_warning("No analysis yet. Run /analyze first."),
            },
            Command::Status => display.show_status(session),
            Command::Reset => {
                session.reset()?;
                display.show_info("Session reset. Filters, prompts and results restored to defaults.");
                display.show_status(session);
            }
            Command::Clear => display.clear_screen()?,
            Command::Invalid { message } => display.show_error(&message),
            Command::Unknown { input } => display.show_unknown(&input),
        }
        Ok(CommandOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::Review;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("/h"), Command::Help);
        assert_eq!(parse("/exit"), Command::Exit);
        assert_eq!(parse("/quit"), Command::Exit);
        assert_eq!(parse("/combine"), Command::Combine);
        assert_eq!(parse("/analyze"), Command::Analyze);
        assert_eq!(parse("/status"), Command::Status);
        assert_eq!(parse("/reset"), Command::Reset);
        assert_eq!(parse("/result"), Command::Result);
        assert_eq!(parse("/properties"), Command::Properties);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(parse("/HELP"), Command::Help);
        assert_eq!(parse("  /Status  "), Command::Status);
    }

    #[test]
    fn test_parse_property_keeps_spaces() {
        assert_eq!(
            parse("/property The Savoy"),
            Command::Property {
                selector: "The Savoy".to_string()
            }
        );
        assert!(matches!(parse("/property"), Command::Invalid { .. }));
    }

    #[test]
    fn test_parse_ratings() {
        assert_eq!(parse("/ratings 1 2"), Command::Ratings { ratings: vec![1, 2] });
        assert_eq!(parse("/ratings 1,3, 5"), Command::Ratings { ratings: vec![1, 3, 5] });
        assert_eq!(parse("/ratings"), Command::Ratings { ratings: vec![] });
        assert!(matches!(parse("/ratings one"), Command::Invalid { .. }));
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(
            parse("/dates 2016-01-01 3/31/2016"),
            Command::Dates {
                start: date(2016, 1, 1),
                end: date(2016, 3, 31)
            }
        );
        assert!(matches!(parse("/dates 2016-01-01"), Command::Invalid { .. }));
        assert!(matches!(parse("/dates soon 2016-01-01"), Command::Invalid { .. }));
    }

    #[test]
    fn test_parse_inverted_dates_still_parse() {
        // Rejected later by the session, not by the parser
        assert!(matches!(
            parse("/dates 2016-03-01 2016-01-01"),
            Command::Dates { .. }
        ));
    }

    #[test]
    fn test_parse_model() {
        assert_eq!(parse("/model gpt"), Command::Model { model: ModelId::Gpt4Turbo });
        assert_eq!(parse("/model Mistral"), Command::Model { model: ModelId::Mistral7b });
        assert!(matches!(parse("/model"), Command::Invalid { .. }));
        assert!(matches!(parse("/model llama"), Command::Invalid { .. }));
    }

    #[test]
    fn test_parse_prompts() {
        assert_eq!(parse("/prompt"), Command::Prompt { text: None });
        assert_eq!(
            parse("/prompt List only complaints."),
            Command::Prompt {
                text: Some("List only complaints.".to_string())
            }
        );
        assert_eq!(
            parse("/system Be terse."),
            Command::System {
                text: Some("Be terse.".to_string())
            }
        );
    }

    #[test]
    fn test_parse_reviews_limit() {
        assert_eq!(parse("/reviews"), Command::Reviews { limit: DEFAULT_REVIEW_LIMIT });
        assert_eq!(parse("/reviews 3"), Command::Reviews { limit: 3 });
        assert!(matches!(parse("/reviews all"), Command::Invalid { .. }));
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(parse("/frobnicate"), Command::Unknown { .. }));
        assert!(matches!(parse("not a command"), Command::Unknown { .. }));
        assert!(matches!(parse("/"), Command::Unknown { .. }));
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("/help"));
        assert!(is_command("  /status"));
        assert!(!is_command("help"));
    }

    #[test]
    fn test_resolve_property() {
        let review = |index: u32, name: &str| Review {
            index,
            property_name: name.to_string(),
            rating: 3,
            review_date: date(2016, 1, 1),
            title: None,
            text: None,
        };
        let table = ReviewTable::new(vec![
            review(1, "The Savoy"),
            review(2, "Ridgemount Hotel"),
            review(3, "The Savoy"),
        ]);

        assert_eq!(resolve_property(&table, "2").as_deref(), Some("Ridgemount Hotel"));
        assert_eq!(resolve_property(&table, "the savoy").as_deref(), Some("The Savoy"));
        assert_eq!(resolve_property(&table, "0"), None);
        assert_eq!(resolve_property(&table, "3"), None);
        assert_eq!(resolve_property(&table, "Hilton"), None);
    }
}
