//! Tracing setup for the CLI.
//!
//! Console output goes to stderr, filtered by `RUST_LOG` (default `warn`,
//! `info` with `--verbose`). With `--logging` every event down to `debug`,
//! including each line the external tools print, is also written to a file.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const DEFAULT_LOG_FILE: &str = "gmapmaker.log";

/// Log file for a `--logging [FILE]` value; `.log` is appended when missing.
pub fn log_file_path(value: Option<&str>) -> PathBuf {
  match value {
    None | Some("") => PathBuf::from(DEFAULT_LOG_FILE),
    Some(name) if name.ends_with(".log") => PathBuf::from(name),
    Some(name) => PathBuf::from(format!("{}.log", name)),
  }
}

pub fn init(verbose: bool, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
  let default = if quiet {
    "error"
  } else if verbose {
    "info"
  } else {
    "warn"
  };
  let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  let console = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .without_time()
    .with_target(false)
    .with_filter(console_filter);

  let file = match log_file {
    Some(path) => {
      let file = File::create(&path).with_context(|| format!("Failed to create log file {}", path.display()))?;
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));
      Some(layer)
    }
    None => None,
  };

  tracing_subscriber::registry()
    .with(console)
    .with(file)
    .try_init()
    .context("Failed to initialize logging")?;
  Ok(())
}
