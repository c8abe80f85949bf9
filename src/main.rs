mod cache;
mod config;
mod producer;

use chrono::{DateTime, Utc};
use clap::Parser;
use color_eyre::{eyre::WrapErr, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use cache::{Held, HoldDir};
use config::{Config, Mode, Output};
use producer::{CommandProducer, FileConcat, StdinProducer};

#[derive(Parser, Debug)]
#[command(name = "hold")]
#[command(about = "Cache the output of slow commands and file reads")]
#[command(version)]
struct Args {
  /// Arguments are a command; its output is cached (default)
  #[arg(short = 'e', long = "exec")]
  command: bool,

  /// Arguments are files; their concatenated content is cached
  #[arg(short, long)]
  files: bool,

  /// Only retrieve cached content, never recompute
  #[arg(short, long)]
  get: bool,

  /// Cache standard input
  #[arg(short, long)]
  stash: bool,

  /// List cache names
  #[arg(short, long)]
  list: bool,

  /// Print the cached content instead of the entry path
  #[arg(short, long)]
  print: bool,

  /// Print nothing
  #[arg(short, long)]
  quiet: bool,

  /// Cache directory (default: $XDG_CACHE_HOME/hold)
  #[arg(short, long, env = "HOLD_DIR")]
  dir: Option<PathBuf>,

  /// Cache name (default: the command or first file name)
  #[arg(short, long)]
  name: Option<String>,

  /// Serve entries younger than this, e.g. 30s, 10m, 2h
  #[arg(short = 't', long)]
  max_age: Option<humantime::Duration>,

  /// Ignore cached entries and recompute
  #[arg(short = 'x', long)]
  no_cache: bool,

  /// Path to config file (default: $XDG_CONFIG_HOME/hold/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Command and its arguments, or files
  #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
  args: Vec<OsString>,
}

fn main() -> Result<()> {
  color_eyre::install()?;
  let _guard = init_tracing();

  let args = Args::parse();
  let config = Config::from_args(args, Utc::now())?;

  let hold = HoldDir::open(&config.directory)?;
  run(&hold, &config)
}

/// Log to stderr so stdout only ever carries the selected output.
fn init_tracing() -> WorkerGuard {
  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
  let filter = EnvFilter::try_from_env("HOLD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_target(false)
    .init();

  guard
}

fn run(hold: &HoldDir, config: &Config) -> Result<()> {
  let name = config.name.as_deref().unwrap_or_default();

  let held = match &config.mode {
    Mode::Command { program, args } => {
      hold.load(name, config.cutoff, CommandProducer::new(program, args))?
    }
    Mode::Files(files) => hold.load(name, config.cutoff, FileConcat::new(files))?,
    Mode::Stash => hold.load(name, config.cutoff, StdinProducer)?,
    Mode::Retrieve => retrieve(hold, name, config.cutoff)?,
    Mode::List => return list(hold, config.output, &mut std::io::stdout().lock()),
  };

  debug!(
    cache = name,
    root = %hold.root().display(),
    source = ?held.source,
    "served entry"
  );
  print_held(&held, config.output, &mut std::io::stdout().lock())
}

fn retrieve(hold: &HoldDir, name: &str, cutoff: DateTime<Utc>) -> Result<Held> {
  match hold.read_fresh(name, cutoff) {
    Err(e) if e.is_not_found() => Err(e).wrap_err_with(|| {
      format!(
        "Nothing cached after {}",
        cutoff.format("%Y-%m-%d %H:%M:%S UTC")
      )
    }),
    other => Ok(other?),
  }
}

fn list(hold: &HoldDir, output: Output, out: &mut impl Write) -> Result<()> {
  let names = hold.list_names()?;
  if output == Output::Quiet {
    return Ok(());
  }

  for name in names {
    writeln!(out, "{}", name)?;
  }
  out.flush()?;
  Ok(())
}

fn print_held(held: &Held, output: Output, out: &mut impl Write) -> Result<()> {
  match output {
    Output::Path => writeln!(out, "{}", held.path.display())?,
    Output::Content => {
      out.write_all(&held.content)?;
      out.write_all(b"\n")?;
    }
    Output::Quiet => {}
  }
  out.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, ProducerError};
  use tempfile::TempDir;

  fn store() -> (TempDir, HoldDir) {
    let dir = TempDir::new().unwrap();
    let hold = HoldDir::open(dir.path()).unwrap();
    (dir, hold)
  }

  fn an_hour_ago() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::hours(1)
  }

  #[test]
  fn test_retrieve_serves_fresh_entry() {
    let (_dir, hold) = store();
    let written = hold.write("ls", b"listing".to_vec()).unwrap();

    let held = retrieve(&hold, "ls", an_hour_ago()).unwrap();
    assert_eq!(held.content, b"listing");
    assert_eq!(held.path, written.path);
    assert_eq!(held.source, CacheSource::Cache);
  }

  #[test]
  fn test_retrieve_miss_names_the_cutoff() {
    let (_dir, hold) = store();
    let cutoff = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    let err = retrieve(&hold, "ls", cutoff).unwrap_err();
    assert_eq!(err.to_string(), "Nothing cached after 2023-11-14 22:13:20 UTC");
    assert!(err.root_cause().to_string().contains("no cached files"));
  }

  #[test]
  fn test_retrieve_never_runs_anything_on_stale_history() {
    let (_dir, hold) = store();
    hold.write("ls", b"old".to_vec()).unwrap();

    let err = retrieve(&hold, "ls", Utc::now()).unwrap_err();
    assert!(err.to_string().starts_with("Nothing cached after"));
  }

  #[test]
  fn test_list_prints_names_one_per_line() {
    let (_dir, hold) = store();
    hold.write("a", b"1".to_vec()).unwrap();
    hold.write("b", b"2".to_vec()).unwrap();

    let mut out = Vec::new();
    list(&hold, Output::Path, &mut out).unwrap();
    assert_eq!(out, b"b\na\n");
  }

  #[test]
  fn test_list_quiet_prints_nothing() {
    let (_dir, hold) = store();
    hold.write("a", b"1".to_vec()).unwrap();

    let mut out = Vec::new();
    list(&hold, Output::Quiet, &mut out).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn test_print_held_modes() {
    let (_dir, hold) = store();
    let held = hold
      .load("t1", Utc::now(), || Ok::<_, ProducerError>(b"content".to_vec()))
      .unwrap();

    let mut out = Vec::new();
    print_held(&held, Output::Path, &mut out).unwrap();
    assert_eq!(out, format!("{}\n", held.path.display()).into_bytes());

    let mut out = Vec::new();
    print_held(&held, Output::Content, &mut out).unwrap();
    assert_eq!(out, b"content\n");

    let mut out = Vec::new();
    print_held(&held, Output::Quiet, &mut out).unwrap();
    assert!(out.is_empty());
  }
}
