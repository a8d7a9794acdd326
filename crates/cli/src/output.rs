//! Terminal output for the CLI.
//!
//! Every status line is a colored symbol followed by the message. Progress
//! goes to stdout, problems go to stderr.

use std::io::{self, Write};

use anyhow::Context;
use owo_colors::{OwoColorize, Stream, Style};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIP: &str = "-";
}

fn status_line(stream: Stream, symbol: &str, symbol_style: Style, message: &str, message_style: Style) {
  let line = format!(
    "{} {}",
    symbol.if_supports_color(stream, |s| s.style(symbol_style)),
    message.if_supports_color(stream, |s| s.style(message_style))
  );
  // A closed pipe (`gmapmaker build | head`) must not abort a running build.
  let _ = match stream {
    Stream::Stderr => writeln!(io::stderr().lock(), "{}", line),
    _ => writeln!(io::stdout().lock(), "{}", line),
  };
}

/// First 12 hex digits, enough to tell two builds apart.
pub fn truncate_hash(hash: &str) -> &str {
  &hash[..hash.len().min(12)]
}

/// Decimal units, the way map download pages report file sizes.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [(u64, &str); 3] = [(1_000_000_000, "GB"), (1_000_000, "MB"), (1_000, "kB")];

  UNITS
    .iter()
    .find(|(size, _)| bytes >= *size)
    .map(|(size, unit)| format!("{:.1} {}", bytes as f64 / *size as f64, unit))
    .unwrap_or_else(|| format!("{} B", bytes))
}

pub fn print_success(message: &str) {
  status_line(Stream::Stdout, symbols::SUCCESS, Style::new().green(), message, Style::new());
}

pub fn print_error(message: &str) {
  status_line(Stream::Stderr, symbols::ERROR, Style::new().red(), message, Style::new().red());
}

pub fn print_warning(message: &str) {
  status_line(Stream::Stderr, symbols::WARNING, Style::new().yellow(), message, Style::new().yellow());
}

pub fn print_info(message: &str) {
  status_line(Stream::Stdout, symbols::INFO, Style::new().blue(), message, Style::new());
}

/// A stage is about to check its cache.
pub fn print_stage(name: &str) {
  status_line(Stream::Stdout, symbols::ARROW, Style::new().cyan(), name, Style::new().bold());
}

/// A stage found its output still valid.
pub fn print_skipped(name: &str) {
  let dim = Style::new().dimmed();
  status_line(Stream::Stdout, symbols::SKIP, dim, &format!("{} (up to date)", name), dim);
}

/// Indented `label: value` line under a heading.
pub fn print_stat(label: &str, value: &str) {
  let _ = writeln!(
    io::stdout().lock(),
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashes_are_cut_to_twelve_digits() {
    let digest = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
    assert_eq!(truncate_hash(digest), "9f86d081884c");
    assert_eq!(truncate_hash("abc"), "abc");
    assert_eq!(truncate_hash(""), "");
  }

  #[test]
  fn sizes_use_decimal_units() {
    assert_eq!(format_bytes(999), "999 B");
    assert_eq!(format_bytes(1_500), "1.5 kB");
    assert_eq!(format_bytes(250_000_000), "250.0 MB");
    assert_eq!(format_bytes(2_000_000_000), "2.0 GB");
  }
}
