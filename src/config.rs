use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::Args;

/// Settings read from the optional config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
  /// Cache root directory
  pub directory: Option<PathBuf>,
  /// Default maximum age of a usable entry, e.g. "10m" or "1h 30m"
  pub max_age: Option<String>,
}

impl FileConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. $XDG_CONFIG_HOME/hold/config.yaml
  ///
  /// No file at all means defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("hold").join("config.yaml");
    path.exists().then_some(path)
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: FileConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn max_age(&self) -> Result<Option<Duration>> {
    self
      .max_age
      .as_deref()
      .map(|s| humantime::parse_duration(s).map_err(|e| eyre!("Invalid max_age {:?}: {}", s, e)))
      .transpose()
  }
}

/// What to do with the positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  /// Run a command and cache its standard output
  Command { program: OsString, args: Vec<OsString> },
  /// Cache the concatenated content of files
  Files(Vec<PathBuf>),
  /// Serve a fresh entry only, never recompute
  Retrieve,
  /// Cache standard input
  Stash,
  /// Print the cache names present
  List,
}

/// What to print on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Output {
  /// Path of the entry used
  #[default]
  Path,
  /// The entry's content
  Content,
  Quiet,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
  pub mode: Mode,
  pub output: Output,
  pub directory: PathBuf,
  /// Cache name; `None` only in list mode
  pub name: Option<String>,
  /// Entries written at or before this instant are stale
  pub cutoff: DateTime<Utc>,
}

impl Config {
  /// Resolve flags, environment and config file into a run configuration.
  pub fn from_args(args: Args, now: DateTime<Utc>) -> Result<Self> {
    let file = FileConfig::load(args.config.as_deref())?;
    Self::resolve(args, file, now)
  }

  fn resolve(args: Args, file: FileConfig, now: DateTime<Utc>) -> Result<Self> {
    let output = if args.quiet {
      Output::Quiet
    } else if args.print {
      Output::Content
    } else {
      Output::default()
    };

    let max_age = match args.max_age {
      Some(d) => d.into(),
      None => file.max_age()?.unwrap_or(Duration::ZERO),
    };
    let cutoff = if args.no_cache {
      now
    } else {
      cutoff_before(now, max_age)
    };

    let directory = resolve_directory(args.dir, file.directory)?;
    let name = args
      .name
      .or_else(|| args.args.first().and_then(|first| default_name(first)));

    // Later mode flags take priority, as with the original flag handling
    let mode = if args.list {
      Mode::List
    } else if args.stash {
      Mode::Stash
    } else if args.get {
      Mode::Retrieve
    } else if args.files {
      if args.args.is_empty() {
        return Err(eyre!("expected one or more files"));
      }
      Mode::Files(args.args.into_iter().map(PathBuf::from).collect())
    } else {
      debug!(explicit = args.command, "command mode");
      let mut positional = args.args.into_iter();
      let program = positional.next().ok_or_else(|| eyre!("expected command"))?;
      Mode::Command {
        program,
        args: positional.collect(),
      }
    };

    if name.is_none() && mode != Mode::List {
      return Err(eyre!("expected a cache name (use -n)"));
    }

    Ok(Self {
      mode,
      output,
      directory,
      name,
      cutoff,
    })
  }
}

/// `now - max_age`, clamped to the earliest representable instant so a huge
/// age means "everything on disk is fresh".
fn cutoff_before(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
  chrono::Duration::from_std(max_age)
    .ok()
    .and_then(|age| now.checked_sub_signed(age))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The file name of the first positional argument, so `/usr/bin/ls` caches as `ls`.
fn default_name(first: &OsString) -> Option<String> {
  Path::new(first)
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
}

/// Flag or `HOLD_DIR`, then the config file, then the per-user cache directory.
fn resolve_directory(flag: Option<PathBuf>, file: Option<PathBuf>) -> Result<PathBuf> {
  if let Some(dir) = flag.filter(|d| !d.as_os_str().is_empty()) {
    return Ok(dir);
  }
  if let Some(dir) = file {
    return Ok(dir);
  }

  let cache_dir = dirs::cache_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
    .ok_or_else(|| eyre!("Could not determine cache directory; set HOLD_DIR"))?;

  Ok(cache_dir.join("hold"))
}
