//! Destinations for tool output lines.

use std::io::{self, Write};

use tracing::debug;

use super::types::{Channel, ToolInvocation};

/// Receives every line a tool prints, as soon as it is read.
///
/// Long-running tools (the splitter and the map compiler run for minutes) have
/// no other progress indicator, so sinks must not buffer until exit.
pub trait LineSink: Send + Sync {
  /// Called once before the tool is spawned.
  fn started(&self, _invocation: &ToolInvocation) {}

  fn line(&self, channel: Channel, line: &str);
}

/// Echoes tool output to the console and to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
  /// Keep the console silent; lines still reach the log.
  pub quiet: bool,
}

impl ConsoleSink {
  pub fn new(quiet: bool) -> Self {
    Self { quiet }
  }
}

impl LineSink for ConsoleSink {
  fn started(&self, invocation: &ToolInvocation) {
    if !self.quiet {
      echo(&format!("[RUN] {}", invocation));
    }
  }

  fn line(&self, channel: Channel, line: &str) {
    debug!(channel = %channel, "{}", line);
    if !self.quiet {
      echo(line);
    }
  }
}

/// Logs tool output without touching the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LineSink for LogSink {
  fn line(&self, channel: Channel, line: &str) {
    debug!(channel = %channel, "{}", line);
  }
}

/// Write one line to `out`. A reader that went away (`gmapmaker build | head`)
/// is not an error; the build keeps running.
fn write_line(out: &mut impl Write, line: &str) -> io::Result<()> {
  match writeln!(out, "{}", line) {
    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
    other => other,
  }
}

fn echo(line: &str) {
  if let Err(e) = write_line(&mut io::stdout().lock(), line) {
    debug!(error = %e, "console echo failed");
  }
}
