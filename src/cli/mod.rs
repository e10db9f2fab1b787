//! CLI module for Review Analyzer
//!
//! Handles command-line argument parsing and configuration management.

pub mod args;
pub mod config;

pub use args::{Args, Commands, FilterArgs, Verbosity};
pub use config::{Config, PASSWORD_ENV};
