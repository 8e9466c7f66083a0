use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use dr_providers::OpenAIProvider;
use dr_tools::create_research_tools;

mod config;
mod manager;
mod util;

use config::Config;
use manager::{ResearchEvent, ResearchManager};
use util::{format_duration, sanitize_query};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: all tracing
    Trace,
    /// Verbose: LLM requests/responses, tool execution details
    Debug,
    /// Standard: high-level pipeline flow
    Info,
    /// Quiet: only warnings and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "dr")]
#[command(author, version, about = "Deep research: plan, search, synthesize, deliver", long_about = None)]
pub struct Cli {
    /// Research query
    pub query: Option<String>,

    /// Model to use (overrides config default)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL for the API (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of searches the planner should produce
    #[arg(short = 'n', long)]
    pub max_searches: Option<usize>,

    /// Skip email delivery even if it is configured
    #[arg(long)]
    pub no_email: bool,

    /// Write the markdown report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to the config file (default: ~/.config/dr/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Config,
    /// Initialize a config file in ~/.config/dr
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve log level: --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    // Progress goes to stdout, so tracing goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.as_filter()))
        .with_writer(std::io::stderr)
        .init();

    // Handle setup before config is required
    if matches!(&cli.command, Some(Commands::Setup)) {
        return run_setup();
    }

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Some(Commands::Config) => show_config(&cli, &config),
        Some(Commands::Setup) => unreachable!(),
        None => research(&cli, &config).await,
    }
}

fn run_setup() -> Result<()> {
    let path = Config::default_path()?;
    if config::write_sample_config(&path)? {
        println!("Wrote sample config to {}", path.display());
        println!("Edit it to add your API keys and email addresses.");
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

fn show_config(cli: &Cli, config: &Config) -> Result<()> {
    let path = match &cli.config {
        Some(p) => p.clone(),
        None => Config::default_path()?,
    };
    println!("Config file: {}", path.display());
    println!();
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

async fn research(cli: &Cli, config: &Config) -> Result<()> {
    let Some(raw_query) = &cli.query else {
        bail!("No query given. Usage: dr \"your research question\"");
    };
    let query = sanitize_query(raw_query);
    if query.is_empty() {
        bail!("Query is empty after sanitization");
    }

    // Provider
    let api_key = config.provider_api_key()?;
    let mut provider = OpenAIProvider::new(api_key);
    if let Some(base_url) = cli.base_url.as_ref().or(config.provider.base_url.as_ref()) {
        provider = provider.with_base_url(base_url);
    }
    if let Some(model) = cli.model.as_ref().or(config.provider.model.as_ref()) {
        provider = provider.with_default_model(model);
    }

    // Tools; email is optional and can be switched off per run.
    let email_config = if cli.no_email {
        None
    } else {
        config.email_config()?
    };
    let email_enabled = email_config.is_some();
    if !cli.no_email && !email_enabled {
        eprintln!("Note: no [email] section configured, skipping delivery.");
    }
    let tools = create_research_tools(config.search_config(), email_config);

    let max_searches = cli
        .max_searches
        .or(config.max_searches)
        .unwrap_or(dr_agents::DEFAULT_SEARCH_COUNT);

    let manager = ResearchManager::new(Arc::new(provider), tools)
        .with_max_searches(max_searches)
        .with_email(email_enabled);

    let started = Instant::now();
    let mut events = manager.run(query);
    let mut report = None;

    while let Some(event) = events.next().await {
        match event {
            ResearchEvent::Started { trace_id } => {
                println!("Starting research ({})...", trace_id);
            }
            ResearchEvent::Planned { searches } => {
                println!("Will perform {} searches", searches);
            }
            ResearchEvent::SearchProgress { completed, total } => {
                println!("Searching... {}/{} completed", completed, total);
            }
            ResearchEvent::SearchesComplete { results } => {
                println!("Finished searching ({} results), writing report...", results);
            }
            ResearchEvent::ReportWritten { short_summary } => {
                println!("Report written: {}", short_summary);
            }
            ResearchEvent::EmailSent => {
                println!("Email sent");
            }
            ResearchEvent::EmailSkipped => {
                println!("Email delivery skipped");
            }
            ResearchEvent::Completed { report: r } => {
                report = Some(r);
            }
            ResearchEvent::Failed { stage, error } => {
                bail!("Research failed at {} stage: {}", stage, error);
            }
        }
    }

    let Some(report) = report else {
        bail!("Research ended without producing a report");
    };

    println!("Done in {}", format_duration(started.elapsed()));
    println!();

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &report.markdown_report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => {
            println!("{}", report.markdown_report);
        }
    }

    if !report.follow_up_questions.is_empty() {
        println!();
        println!("Follow-up questions:");
        for question in &report.follow_up_questions {
            println!("  - {}", question);
        }
    }

    Ok(())
}
