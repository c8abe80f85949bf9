//! Error taxonomy for the cache store.

use std::path::PathBuf;
use thiserror::Error;

use super::traits::ProducerError;

/// Errors returned by [`HoldDir`](super::HoldDir) operations.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The cache name is empty or contains something other than ASCII letters and digits.
  #[error("invalid cache name {0:?}")]
  InvalidName(String),

  /// No entries exist for the name, or none are fresh.
  #[error("no cached files for {0:?}")]
  NotFound(String),

  #[error("{operation} {}: {source}", .path.display())]
  Io {
    operation: &'static str,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A stored filename that matches a cache name but cannot be decoded.
  #[error("corrupt cache entry {}: {reason}", .path.display())]
  Corrupt { path: PathBuf, reason: String },

  /// The producer failed; its error is passed through untouched.
  #[error(transparent)]
  Producer(#[from] ProducerError),
}

impl CacheError {
  pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      operation,
      path: path.into(),
      source,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }
}

pub type Result<T> = std::result::Result<T, CacheError>;
