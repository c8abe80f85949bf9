//! Filesystem-backed cache store.

use chrono::{DateTime, SubsecRound, Utc};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::entries::{self, Entry};
use super::error::{CacheError, Result};
use super::name::is_valid_name;
use super::traits::{Held, Producer};

/// A cache root directory holding `<name>.<timestamp>` entries.
///
/// Entries are only ever added. Nothing here deletes or rewrites an entry once
/// it has been served.
#[derive(Debug, Clone)]
pub struct HoldDir {
  root: PathBuf,
}

impl HoldDir {
  /// Open the store at `root`, creating the directory if needed.
  pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    std::fs::create_dir_all(&root).map_err(|e| CacheError::io("create directory", &root, e))?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Persist `content` as a new entry for `name` stamped with the current second.
  ///
  /// The name is not validated here. The bytes land in a hidden temporary file
  /// first and are renamed into place, so a reader never sees a partial entry.
  pub fn write(&self, name: &str, content: Vec<u8>) -> Result<Held> {
    let now = Utc::now().trunc_subsecs(0);
    let path = self.root.join(entries::entry_file_name(name, now));

    let mut tmp =
      NamedTempFile::new_in(&self.root).map_err(|e| CacheError::io("create", &self.root, e))?;
    tmp
      .write_all(&content)
      .map_err(|e| CacheError::io("write", tmp.path(), e))?;
    tmp
      .as_file()
      .sync_all()
      .map_err(|e| CacheError::io("sync", tmp.path(), e))?;
    if path.exists() {
      debug!(cache = name, path = %path.display(), "replacing entry written in the same second");
    }
    tmp
      .persist(&path)
      .map_err(|e| CacheError::io("rename", &path, e.error))?;

    debug!(cache = name, path = %path.display(), bytes = content.len(), "stored entry");
    Ok(Held::from_producer(content, path))
  }

  /// Read the newest entry for `name` written after `cutoff`.
  ///
  /// `NotFound` covers both "never written" and "only stale entries".
  pub fn read_fresh(&self, name: &str, cutoff: DateTime<Utc>) -> Result<Held> {
    let listed = entries::list_entries(&self.root, name)?;
    let (fresh, _stale) = entries::partition(listed, cutoff);
    match fresh.into_iter().next() {
      Some(entry) => self.read_entry(entry),
      None => Err(CacheError::NotFound(name.to_string())),
    }
  }

  /// Serve the newest fresh entry for `name`, or run `producer` and store its output.
  ///
  /// The whole lookup-or-produce sequence holds an exclusive lock on the name,
  /// so concurrent misses run the producer once and later callers find its entry.
  /// Stale entries are never served.
  pub fn load<P: Producer>(&self, name: &str, cutoff: DateTime<Utc>, mut producer: P) -> Result<Held> {
    if !is_valid_name(name) {
      return Err(CacheError::InvalidName(name.to_string()));
    }

    let _lock = NameLock::acquire(&self.root, name)?;

    let listed = match entries::list_entries(&self.root, name) {
      Ok(listed) => listed,
      Err(CacheError::NotFound(_)) => Vec::new(),
      Err(e) => return Err(e),
    };
    let (fresh, stale) = entries::partition(listed, cutoff);

    if let Some(entry) = fresh.into_iter().next() {
      debug!(cache = name, path = %entry.path.display(), "cache hit");
      return self.read_entry(entry);
    }

    debug!(cache = name, stale = stale.len(), "cache miss");
    let content = producer.produce().map_err(|e| {
      warn!(cache = name, error = %e, "producer failed");
      CacheError::Producer(e)
    })?;

    self.write(name, content)
  }

  /// Names with at least one entry, in descending order.
  pub fn list_names(&self) -> Result<Vec<String>> {
    entries::list_names(&self.root)
  }

  fn read_entry(&self, entry: Entry) -> Result<Held> {
    let content = std::fs::read(&entry.path).map_err(|e| CacheError::io("read", &entry.path, e))?;
    Ok(Held::from_cache(content, entry.path))
  }
}

/// Exclusive advisory lock on `<root>/.<name>.lock`, released on drop.
struct NameLock {
  _file: File,
}

impl NameLock {
  fn acquire(root: &Path, name: &str) -> Result<Self> {
    let path = root.join(format!(".{}.lock", name));
    let file = OpenOptions::new()
      .create(true)
      .truncate(false)
      .write(true)
      .open(&path)
      .map_err(|e| CacheError::io("open lock", &path, e))?;

    FileExt::lock_exclusive(&file).map_err(|e| CacheError::io("lock", &path, e))?;

    Ok(Self { _file: file })
  }
}
