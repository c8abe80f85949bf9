//! Locating and ordering the entries stored under a cache root.
//!
//! Every entry is a plain file named `<name>.<timestamp>`. The filename is the
//! only index: listing a name means scanning the root for matching files and
//! decoding the timestamp back out of each one.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::error::{CacheError, Result};
use super::name::FIELD_SEPARATOR;

/// A stored entry, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub path: PathBuf,
  /// Whole-second write time encoded in the filename
  pub timestamp: DateTime<Utc>,
}

impl Entry {
  /// Fresh iff written strictly after the cutoff.
  pub fn is_fresh(&self, cutoff: DateTime<Utc>) -> bool {
    self.timestamp > cutoff
  }
}

/// Filename for an entry of `name` written at `timestamp`.
pub fn entry_file_name(name: &str, timestamp: DateTime<Utc>) -> String {
  format!("{}{}{}", name, FIELD_SEPARATOR, timestamp.timestamp())
}

/// List every entry stored for `name`, newest first.
///
/// Fails with `NotFound` when the name has no entries, and with `Corrupt` when a
/// matching filename carries something other than a decimal timestamp.
pub fn list_entries(root: &Path, name: &str) -> Result<Vec<Entry>> {
  let prefix = format!("{}{}", name, FIELD_SEPARATOR);

  let mut entries = Vec::new();
  for (file_name, path) in stored_files(root)? {
    let Some(field) = file_name.strip_prefix(&prefix) else {
      continue;
    };
    let timestamp = parse_timestamp(field).ok_or_else(|| CacheError::Corrupt {
      path: path.clone(),
      reason: format!("timestamp field {:?} is not a decimal epoch second", field),
    })?;
    entries.push(Entry { path, timestamp });
  }

  if entries.is_empty() {
    return Err(CacheError::NotFound(name.to_string()));
  }

  // Numeric order does not depend on how many digits the timestamp has;
  // same-second entries fall back to path order.
  entries.sort_by(|a, b| {
    b.timestamp
      .cmp(&a.timestamp)
      .then_with(|| b.path.cmp(&a.path))
  });

  Ok(entries)
}

/// Split entries into `(fresh, stale)` against `cutoff`, keeping their order.
pub fn partition(entries: Vec<Entry>, cutoff: DateTime<Utc>) -> (Vec<Entry>, Vec<Entry>) {
  entries.into_iter().partition(|e| e.is_fresh(cutoff))
}

/// Every cache name that has at least one entry, in descending order.
pub fn list_names(root: &Path) -> Result<Vec<String>> {
  let names: BTreeSet<String> = stored_files(root)?
    .into_iter()
    .filter_map(|(file_name, _)| {
      file_name
        .split(FIELD_SEPARATOR)
        .next()
        .map(str::to_string)
    })
    .collect();

  Ok(names.into_iter().rev().collect())
}

fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
  if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let secs: i64 = field.parse().ok()?;
  DateTime::from_timestamp(secs, 0)
}

/// Regular files directly under `root`, as `(file name, path)` pairs.
///
/// Hidden files are skipped: the store keeps its lock files and in-flight
/// temporary files there, and neither is an entry.
fn stored_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
  let dir = std::fs::read_dir(root).map_err(|e| CacheError::io("read directory", root, e))?;

  let mut files = Vec::new();
  for dirent in dir {
    let dirent = dirent.map_err(|e| CacheError::io("read directory", root, e))?;
    let file_type = dirent
      .file_type()
      .map_err(|e| CacheError::io("stat", dirent.path(), e))?;
    if !file_type.is_file() {
      continue;
    }

    // Non-UTF-8 names cannot have been written by the store
    let Ok(file_name) = dirent.file_name().into_string() else {
      continue;
    };
    if file_name.starts_with('.') {
      continue;
    }
    files.push((file_name, dirent.path()));
  }

  Ok(files)
}
