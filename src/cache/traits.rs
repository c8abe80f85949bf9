//! Core traits and types for the caching system.

use std::fmt;
use std::path::PathBuf;

/// Anything that can compute the bytes to store on a cache miss.
///
/// Implemented for plain closures so callers can write
/// `store.load(name, cutoff, || Ok(b"...".to_vec()))`.
pub trait Producer {
  fn produce(&mut self) -> Result<Vec<u8>, ProducerError>;
}

impl<F> Producer for F
where
  F: FnMut() -> Result<Vec<u8>, ProducerError>,
{
  fn produce(&mut self) -> Result<Vec<u8>, ProducerError> {
    self()
  }
}

/// Failure reported by a [`Producer`].
#[derive(Debug)]
pub struct ProducerError {
  message: String,
  source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ProducerError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      source: None,
    }
  }

  pub fn with_source(
    message: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self {
      message: message.into(),
      source: Some(Box::new(source)),
    }
  }
}

impl fmt::Display for ProducerError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl std::error::Error for ProducerError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    self
      .source
      .as_deref()
      .map(|e| e as &(dyn std::error::Error + 'static))
  }
}

/// Content served by the store, with the entry it lives in.
#[derive(Debug, Clone)]
pub struct Held {
  /// The stored bytes
  pub content: Vec<u8>,
  /// Path of the entry the bytes were read from or written to
  pub path: PathBuf,
  /// Where the content came from
  pub source: CacheSource,
}

impl Held {
  pub fn from_cache(content: Vec<u8>, path: PathBuf) -> Self {
    Self {
      content,
      path,
      source: CacheSource::Cache,
    }
  }

  pub fn from_producer(content: Vec<u8>, path: PathBuf) -> Self {
    Self {
      content,
      path,
      source: CacheSource::Producer,
    }
  }
}

/// Indicates where held content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// A fresh entry already on disk
  Cache,
  /// Computed on a miss and written as a new entry
  Producer,
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::error::Error;

  #[test]
  fn test_closure_is_a_producer() {
    let mut calls = 0;
    let mut producer = || {
      calls += 1;
      Ok::<_, ProducerError>(b"out".to_vec())
    };
    assert_eq!(producer.produce().unwrap(), b"out");
    assert_eq!(producer.produce().unwrap(), b"out");
    assert_eq!(calls, 2);
  }

  #[test]
  fn test_producer_error_keeps_source() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
    let err = ProducerError::with_source("read notes.txt", io);
    assert_eq!(err.to_string(), "read notes.txt");
    assert_eq!(err.source().unwrap().to_string(), "no such file");
  }
}
