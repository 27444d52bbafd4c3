//! Terminal output for fnpack commands.
//!
//! Results go to stdout and problems to stderr, so `--format json` output on
//! stdout stays parseable even when warnings are printed.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Kind of status line, which decides its symbol, color and stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Success,
  Unchanged,
  Failed,
  Warning,
  Info,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => "✓",
      Status::Unchanged => "=",
      Status::Failed => "✗",
      Status::Warning => "⚠",
      Status::Info => "•",
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Status::Success => AnsiColors::Green,
      Status::Unchanged => AnsiColors::BrightBlack,
      Status::Failed => AnsiColors::Red,
      Status::Warning => AnsiColors::Yellow,
      Status::Info => AnsiColors::Blue,
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Failed | Status::Warning => Stream::Stderr,
      _ => Stream::Stdout,
    }
  }
}

pub fn status(kind: Status, message: &str) {
  let stream = kind.stream();
  let symbol_text = kind.symbol();
  let symbol = symbol_text.if_supports_color(stream, |s| s.color(kind.color()));
  match stream {
    Stream::Stderr => eprintln!("{} {}", symbol, message),
    _ => println!("{} {}", symbol, message),
  }
}

/// An indented `label: value` summary line.
pub fn stat(label: &str, value: impl std::fmt::Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// `850ms`, `2.40s`, `3m 5s`.
pub fn format_duration(duration: Duration) -> String {
  match duration.as_secs() {
    0 => format!("{}ms", duration.as_millis()),
    secs if secs < 60 => format!("{:.2}s", duration.as_secs_f64()),
    secs => format!("{}m {}s", secs / 60, secs % 60),
  }
}
