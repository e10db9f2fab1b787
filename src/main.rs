//! Review Analyzer - Main CLI Entry Point

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use review_analyzer::{
    access::AccessGate,
    cli::{Args, Commands, Config, FilterArgs, Verbosity},
    context::{format_number, TokenCounter},
    models::ModelId,
    repl::{commands::resolve_property, DisplayManager, ReplSession, StreamPrinter},
    reviews::ReviewTable,
    session::{AnalyzerSession, FilterOutcome},
    streaming::ClientFactory,
    telemetry::TelemetryDisplay,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    let verbosity = args.verbosity(&config.telemetry.default_verbosity);

    init_tracing(verbosity);
    if !config.telemetry.color_output {
        colored::control::set_override(false);
    }

    AccessGate::new(config.access_password().as_deref()).authorize_interactive()?;

    let dataset = args.dataset.clone().unwrap_or_else(|| config.dataset_path());

    match &args.command {
        Some(Commands::Config { init: true }) => {
            init_config(&args)?;
        }
        Some(Commands::Config { init: false }) => {
            show_config(&args, &config, &dataset, verbosity);
        }
        Some(Commands::Properties) => {
            let table = load_table(&dataset, verbosity)?;
            list_properties(&table);
        }
        Some(Commands::Tokens { filter }) => {
            let table = load_table(&dataset, verbosity)?;
            let mut session = build_session(&args, &config, table)?;
            apply_filter(&mut session, filter)?;
            show_tokens(&session);
        }
        Some(Commands::Analyze {
            filter,
            prompt,
            system,
        }) => {
            let table = load_table(&dataset, verbosity)?;
            let mut session = build_session(&args, &config, table)?;
            apply_filter(&mut session, filter)?;
            if let Some(prompt) = prompt {
                session.set_main_prompt(prompt.as_str());
            }
            if let Some(system) = system {
                session.set_system_prompt(system.as_str());
            }
            run_analysis(&mut session, &config.client_factory(), verbosity).await?;
        }
        Some(Commands::Start) | None => {
            let table = load_table(&dataset, verbosity)?;
            let session = build_session(&args, &config, table)?;
            run_repl(session, config.client_factory(), verbosity).await?;
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn load_table(path: &Path, verbosity: Verbosity) -> Result<Arc<ReviewTable>> {
    let pb = verbosity
        .show_progress()
        .then(|| spinner(&format!("Loading reviews from {}", path.display())));

    let table = ReviewTable::load(path);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let table = table.with_context(|| format!("Failed to load dataset {}", path.display()))?;
    tracing::info!(reviews = table.len(), path = %path.display(), "dataset loaded");
    Ok(Arc::new(table))
}

fn build_session(args: &Args, config: &Config, table: Arc<ReviewTable>) -> Result<AnalyzerSession> {
    let mut settings = config.session_settings();
    if let Some(model) = args.model {
        settings.default_model = model;
    }
    let counter = Arc::new(TokenCounter::with_mistral_source(config.tokenizer_source()));
    Ok(AnalyzerSession::new(table, counter, settings)?)
}

/// Apply one-shot filter options, then make sure the result is combined
fn apply_filter(session: &mut AnalyzerSession, filter: &FilterArgs) -> Result<FilterOutcome> {
    let mut criteria = session.criteria().clone();
    if let Some(selector) = &filter.property {
        criteria.property_name = resolve_property(session.table(), selector)
            .with_context(|| format!("Unknown property: {}", selector))?;
    }
    if !filter.ratings.is_empty() {
        criteria.ratings = filter.ratings.iter().copied().collect();
    }
    if let Some(from) = filter.from {
        criteria.date_range.start = from;
    }
    if let Some(to) = filter.to {
        criteria.date_range.end = to;
    }

    let outcome = session.apply_criteria(criteria)?;
    if !outcome.auto_combined {
        session.combine()?;
    }
    Ok(outcome)
}

fn list_properties(table: &ReviewTable) {
    for (i, (name, count)) in table.property_counts().iter().enumerate() {
        println!("{:>4}. {} ({})", i + 1, name, format_number(*count));
    }
}

fn show_tokens(session: &AnalyzerSession) {
    println!("{}", session.signature());
    if let Some(block) = session.current_block() {
        println!(
            "{} tokens ({}, ceiling {})",
            format_number(block.token_count()),
            block.model().display_name(),
            format_number(session.ceiling())
        );
    }
    let decision = session.gate();
    if !decision.enabled {
        println!("{}", decision.caption.yellow());
    }
}

/// One-shot analysis streamed to stdout
async fn run_analysis(
    session: &mut AnalyzerSession,
    clients: &ClientFactory,
    verbosity: Verbosity,
) -> Result<()> {
    let decision = session.gate();
    if !decision.enabled {
        bail!("{}", decision.caption);
    }

    let model = session.model();
    let client = clients.client_for(model)?;

    if verbosity.show_progress() {
        eprintln!("{}", session.signature().as_str().dimmed());
    }
    let pb = verbosity
        .show_progress()
        .then(|| spinner(&format!("Waiting for {}...", model.display_name())));
    let mut printer = StreamPrinter::new(pb);

    let result = session.analyze(client.as_ref(), &mut printer).await;
    printer.finish();
    println!();
    result?;

    let telemetry = TelemetryDisplay::new(session.telemetry().clone(), verbosity);
    if telemetry.should_show_details() {
        telemetry.display_summary();
    }
    Ok(())
}

async fn run_repl(session: AnalyzerSession, clients: ClientFactory, verbosity: Verbosity) -> Result<()> {
    let telemetry = session.telemetry().clone();
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".review_analyzer_history");

    let mut repl = ReplSession::with_history(session, clients, verbosity, history_path)?;
    repl.run().await?;

    TelemetryDisplay::new(telemetry, verbosity).display_summary();
    Ok(())
}

/// Write the built-in defaults, refusing to overwrite an existing file
fn init_config(args: &Args) -> Result<()> {
    let path = args
        .config
        .clone()
        .or_else(Config::default_path)
        .context("Cannot determine home directory")?;
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Wrote default configuration to {}", "✓".green(), path.display());
    Ok(())
}

fn show_config(args: &Args, config: &Config, dataset: &Path, verbosity: Verbosity) {
    let display = DisplayManager::new();
    let clients = config.client_factory();
    println!("\n{}", "Review Analyzer Configuration".bold().cyan());
    println!("{}", "=".repeat(64).cyan());

    let source = args
        .config
        .clone()
        .or_else(Config::default_path)
        .filter(|p| p.exists())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    println!("Source:    {}", source);
    println!("Dataset:   {}", dataset.display());
    println!();

    println!("Models:");
    let default_model = args.model.unwrap_or(config.models.default);
    for model in ModelId::ALL {
        let key = if clients.has_key(model) {
            "key set".green()
        } else {
            format!("{} not set", model.api_key_env()).yellow()
        };
        let marker = if model == default_model { "*" } else { " " };
        println!(
            " {} {:<12} ceiling {:>7} tokens  {}",
            marker,
            model.display_name(),
            format_number(config.session_settings().ceiling(model)),
            key
        );
    }
    println!();

    println!("Endpoints:");
    println!("  OpenAI:  {}", config.endpoints.openai_base_url);
    println!("  Mistral: {}", config.endpoints.mistral_base_url);
    println!("  Timeout: {}s", config.endpoints.timeout_secs);
    println!();

    println!("Filters:");
    println!("  Default ratings:    {:?}", config.filters.default_ratings);
    println!("  Auto-combine below: {} reviews", config.filters.auto_combine_limit);
    println!();

    println!(
        "Access:    {}",
        if config.access_password().is_some() {
            "password required"
        } else {
            "open"
        }
    );
    println!("Verbosity: {}", verbosity.as_str());
    println!();

    display.show_prompt_text("Main prompt", &config.prompts.main);
    display.show_prompt_text("System prompt", &config.prompts.system);
}
