//! `maildigest` - daily digest and trend reports for one monitored sender.
//!
//! Pulls mail over IMAP, classifies and summarizes it, and renders a
//! markdown (or JSON) digest with day-over-day and week-over-week trends.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maildigest_core::{
    OutputFormat, Settings, render_failure_digest, run_daily, run_heartbeat, run_trends,
};

#[derive(Parser)]
#[command(name = "maildigest", about = "Daily email digest for a monitored sender", version)]
struct Cli {
    /// Time range in hours (defaults to MAILDIGEST_HOURS or 24)
    #[arg(long, global = true)]
    hours: Option<u32>,

    /// Override the monitored sender address
    #[arg(long, global = true)]
    sender: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "markdown", global = true)]
    format: Format,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the daily digest (the default)
    Run,
    /// Render the weekly trend report from the history log
    Trends,
    /// One-hour scan; exits non-zero when important mail is waiting
    Heartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable markdown digest
    Markdown,
    /// Full run report as JSON
    Structured,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => Self::Markdown,
            Format::Structured => Self::Structured,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "maildigest=debug,maildigest_core=debug,maildigest_imap=debug"
    } else {
        "maildigest=info,maildigest_core=info,maildigest_imap=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::from_env().context("loading configuration")?;
    if let Some(hours) = cli.hours {
        settings.hours = hours;
    }
    if let Some(sender) = cli.sender {
        settings.sender = sender;
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            // A failed run still renders an operator-visible digest
            let output = match run_daily(&settings, cli.format.into()).await {
                Ok(output) => output,
                Err(e) => {
                    error!(error = %e, "digest generation failed");
                    render_failure_digest(&e.to_string(), Utc::now())
                }
            };
            emit(&output, cli.output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Trends => {
            let output = run_trends(&settings);
            emit(&output, cli.output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Heartbeat => match run_heartbeat(&settings).await? {
            Some(alert) => {
                println!("{}", serde_json::to_string(&alert)?);
                // Non-zero exit signals the scheduler to notify
                Ok(ExitCode::from(1))
            }
            None => {
                println!("HEARTBEAT_OK");
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

fn emit(output: &str, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report saved");
        }
        None => println!("{output}"),
    }
    Ok(())
}
