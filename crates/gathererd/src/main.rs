//! Command line front-end for the gatherer paper acquisition library.
//!
//! The binary turns arguments into a [`gatherer::Request`], runs it, and writes the resulting
//! papers as a JSON array (to stdout, or to `--output`). Progress is rendered on stderr so the
//! JSON stream stays clean.
//!
//! # Usage
//!
//! ```bash
//! # One group of terms, any of which may match
//! gatherer terms VLM games --logic or --max-results 50
//!
//! # Every combination of terms across groups, submitted on one day
//! gatherer combine --group "LLM,VLM" --group "games,agents" --date 2025-09-21
//!
//! # Look papers up by title
//! gatherer titles "Attention Is All You Need" "BERT: Pre-training of Deep Bidirectional Transformers"
//! gatherer titles --file reading-list.txt
//!
//! # Re-assemble records saved by an earlier run
//! gatherer cached papers.json --output papers-with-text.json
//! ```
//!
//! Verbosity is controlled with `-v` (repeatable) or `RUST_LOG`; `--log-file` sends the log to a
//! file instead of stderr.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  fs,
  io::Write,
  path::{Path, PathBuf},
  sync::Arc,
};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use gatherer::{
  config::Config,
  event::{Event, EventSink},
  paper::{CachedRecord, Paper},
  query::{DateFilter, Logic, TermGroup},
  Acquired, Gatherer, Request,
};
use tracing::{debug, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Search, download and extract scholarly papers")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Configuration file. Defaults to the platform config directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Directory PDFs are stored in, overriding the configuration
  #[arg(long, global = true)]
  pdf_dir: Option<PathBuf>,

  /// Write logs to this file instead of stderr
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// The returned guard must be held until exit so buffered file output is flushed.
fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  match log_file {
    Some(path) => {
      let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| GathererdError::Usage(format!("{} is not a file", path.display())))?;
      fs::create_dir_all(directory)?;
      let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .init();
      Ok(Some(guard))
    },
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
      Ok(None)
    },
  }
}

/// Loads the configuration file and applies command line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
  let path = cli.config.clone().unwrap_or_else(Config::default_path);
  debug!("Loading configuration from {}", path.display());
  let mut config = Config::load(&path)?;
  if let Some(pdf_dir) = &cli.pdf_dir {
    config = config.with_pdf_dir(pdf_dir);
  }
  Ok(config)
}

/// Writes papers as pretty JSON to `output`, or stdout when absent.
fn write_papers(papers: &[Paper], output: Option<&Path>) -> Result<()> {
  let json = serde_json::to_string_pretty(papers)?;
  match output {
    Some(path) => fs::write(path, json)?,
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(json.as_bytes())?;
      stdout.write_all(b"\n")?;
    },
  }
  Ok(())
}

/// Entry point for the gatherer CLI application
///
/// Parses arguments, sets up logging, runs the requested acquisition and writes the papers.
///
/// # Errors
///
/// Returns [`GathererdError`] for invalid arguments or configuration and for failures reading
/// inputs or writing output. Individual search, download or extraction failures never end the
/// run; they show up as missing papers or empty PDF fields.
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let _guard = setup_logging(cli.verbose, cli.log_file.as_deref())?;
  trace!("Parsed arguments");

  let config = load_config(&cli)?;
  let console = Arc::new(ConsoleSink::stderr());
  let gatherer = Gatherer::new(config)?.with_events(console.clone());

  let (request, output) = match cli.command.request() {
    Ok(parsed) => parsed,
    Err(e) => {
      console.reply(ResponseContent::Error(&e));
      return Err(e);
    },
  };

  let acquired = match gatherer.acquire(&request).await {
    Ok(acquired) => acquired,
    Err(e) => {
      let e = GathererdError::from(e);
      console.reply(ResponseContent::Error(&e));
      return Err(e);
    },
  };

  write_papers(&acquired.papers, output.as_deref())?;
  console.reply(ResponseContent::Summary(&acquired));
  Ok(())
}
