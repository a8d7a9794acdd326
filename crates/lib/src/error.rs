//! Error types for the build pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::build_lock::BuildLockError;
use crate::util::hash::HashError;

/// Errors that abort a pipeline run.
///
/// No stage recovers from its own failure: every variant propagates to the
/// pipeline controller, which stops before running any later stage.
#[derive(Debug, Error)]
pub enum BuildError {
  /// An external tool exited with a nonzero status, or wrote to stderr under
  /// strict mode.
  #[error("{program} returned {} (0 expected)\nstderr: {stderr}", display_code(.code))]
  ToolExecution {
    program: String,
    code: Option<i32>,
    stderr: String,
  },

  /// An external tool could not be started at all.
  #[error("failed to start {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// A stage refused to run because its inputs violate a known limit.
  #[error("{message}")]
  Precondition { message: String },

  /// A stage expected exactly one artifact and found a different number.
  #[error("expected exactly one artifact matching {pattern}, found {found}")]
  ArtifactMissing { pattern: String, found: usize },

  /// Fetching source data failed.
  #[error("download failed for {url}: {message}")]
  Download { url: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("archive error: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("digest error: {0}")]
  Digest(#[from] HashError),

  #[error("failed to write manifest: {0}")]
  Manifest(#[from] serde_json::Error),

  #[error(transparent)]
  Lock(#[from] BuildLockError),
}

impl BuildError {
  pub fn precondition(message: impl Into<String>) -> Self {
    Self::Precondition {
      message: message.into(),
    }
  }

  /// A single expected file that is absent.
  pub fn missing(path: impl Into<PathBuf>) -> Self {
    Self::ArtifactMissing {
      pattern: path.into().display().to_string(),
      found: 0,
    }
  }
}

fn display_code(code: &Option<i32>) -> String {
  match code {
    Some(code) => code.to_string(),
    None => "no exit code (terminated by signal)".to_string(),
  }
}
