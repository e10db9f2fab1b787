//! Command-line argument parsing for Review Analyzer
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::models::ModelId;
use crate::reviews::parse_date;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Review Analyzer - filter hotel reviews and analyze them with an LLM
#[derive(Parser, Debug)]
#[command(name = "review-analyzer")]
#[command(version)]
#[command(about = "Filter hotel reviews and analyze them with GPT-4 Turbo or Mistral 7B", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Review dataset (CSV), overrides the configured path
    #[arg(short, long, global = true)]
    pub dataset: Option<PathBuf>,

    /// Model to start with: gpt or mistral
    #[arg(short, long, global = true, value_parser = parse_model)]
    pub model: Option<ModelId>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress everything except results)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand; interactive mode when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start interactive REPL mode
    Start,

    /// Filter, combine and analyze once, streaming the result to stdout
    Analyze {
        #[command(flatten)]
        filter: FilterArgs,

        /// Main prompt, replaces the configured one
        #[arg(long)]
        prompt: Option<String>,

        /// System prompt, replaces the configured one
        #[arg(long)]
        system: Option<String>,
    },

    /// List properties with their review counts
    Properties,

    /// Print the combined token count for a filter
    Tokens {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Display current configuration
    Config {
        /// Write the default configuration file instead
        #[arg(long)]
        init: bool,
    },
}

/// Filter options shared by one-shot subcommands
///
/// Anything omitted keeps the session default: first property, configured
/// ratings, full date span of the dataset.
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Property name
    #[arg(short, long)]
    pub property: Option<String>,

    /// Ratings, comma separated (e.g. 1,2)
    #[arg(short, long, value_delimiter = ',')]
    pub ratings: Vec<i32>,

    /// First review date (inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last review date (inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

fn parse_model(raw: &str) -> Result<ModelId, String> {
    raw.parse::<ModelId>().map_err(|e| e.to_string())
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("invalid date: {}", raw))
}

impl Args {
    /// Verbosity from flags, falling back to the configured level
    pub fn verbosity(&self, configured: &str) -> Verbosity {
        if self.quiet {
            return Verbosity::Quiet;
        }
        match self.verbose {
            0 => Verbosity::from_name(configured).unwrap_or(Verbosity::Normal),
            1 => Verbosity::Verbose,
            _ => Verbosity::VeryVerbose,
        }
    }
}

impl Verbosity {
    /// Parse a configured level name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub fn log_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show detailed events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Check if should show token counts while streaming
    pub fn show_tokens(&self) -> bool {
        matches!(self, Verbosity::VeryVerbose)
    }
}
