//! Standard producers: run a command, concatenate files, or read stdin.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::cache::{Producer, ProducerError};

/// Runs a program and captures its standard output.
///
/// A spawn failure or a non-zero exit is an error, so a failed run is never cached.
#[derive(Debug, Clone)]
pub struct CommandProducer {
  program: OsString,
  args: Vec<OsString>,
}

impl CommandProducer {
  pub fn new(program: impl Into<OsString>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }
}

impl Producer for CommandProducer {
  fn produce(&mut self) -> Result<Vec<u8>, ProducerError> {
    let program = self.program.to_string_lossy().into_owned();
    debug!(program = %program, args = self.args.len(), "running command");

    let output = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::inherit())
      .stderr(Stdio::inherit())
      .output()
      .map_err(|e| ProducerError::with_source(format!("failed to run {}", program), e))?;

    if !output.status.success() {
      let message = match output.status.code() {
        Some(code) => format!("{} exited with status {}", program, code),
        None => format!("{} was terminated by a signal", program),
      };
      return Err(ProducerError::new(message));
    }

    Ok(output.stdout)
  }
}

/// Reads files in order and concatenates their content.
#[derive(Debug, Clone)]
pub struct FileConcat {
  files: Vec<PathBuf>,
}

impl FileConcat {
  pub fn new(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
    Self {
      files: files.into_iter().map(Into::into).collect(),
    }
  }
}

impl Producer for FileConcat {
  fn produce(&mut self) -> Result<Vec<u8>, ProducerError> {
    let mut out = Vec::new();
    for file in &self.files {
      let content = std::fs::read(file)
        .map_err(|e| ProducerError::with_source(format!("failed to read {}", file.display()), e))?;
      out.extend_from_slice(&content);
    }
    Ok(out)
  }
}

/// Reads all of standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinProducer;

impl Producer for StdinProducer {
  fn produce(&mut self) -> Result<Vec<u8>, ProducerError> {
    let mut out = Vec::new();
    std::io::stdin()
      .lock()
      .read_to_end(&mut out)
      .map_err(|e| ProducerError::with_source("failed to read standard input", e))?;
    Ok(out)
  }
}
