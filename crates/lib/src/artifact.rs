//! Filesystem queries and moves for stage artifacts.
//!
//! Stages never write at a canonical path directly: output goes to a
//! `.partial` name (or a tool-chosen name) and is renamed into place once
//! complete, so a crashed run never leaves a half-written artifact where the
//! next run would mistake it for a cache hit.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::debug;

use crate::consts::PARTIAL_SUFFIX;
use crate::error::BuildError;
use crate::util::hash::{ContentHash, HashError, hash_file};

/// What is known about one artifact at the moment it was probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
  pub path: PathBuf,
  pub digest: Option<ContentHash>,
  pub modified: Option<SystemTime>,
}

impl ArtifactRecord {
  /// Look at `path`; `None` when nothing exists there.
  pub fn probe(path: &Path) -> Option<Self> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(Self {
      path: path.to_path_buf(),
      digest: None,
      modified: metadata.modified().ok(),
    })
  }

  /// Attach the content digest of the artifact.
  pub fn with_digest(mut self) -> Result<Self, HashError> {
    self.digest = Some(hash_file(&self.path)?);
    Ok(self)
  }

  /// Time since the artifact was last modified.
  ///
  /// `None` when the modification time is unknown or in the future.
  pub fn age(&self, now: SystemTime) -> Option<Duration> {
    now.duration_since(self.modified?).ok()
  }
}

/// The `.partial` sibling a stage writes before renaming into `path`.
pub fn partial_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".");
  name.push(PARTIAL_SUFFIX);
  path.with_file_name(name)
}

/// All paths matching a glob pattern, sorted.
pub fn find_all(pattern: &str) -> Result<Vec<PathBuf>, BuildError> {
  let paths = glob::glob(pattern)
    .map_err(|e| BuildError::precondition(format!("invalid artifact pattern {}: {}", pattern, e)))?;

  let mut found = Vec::new();
  for entry in paths {
    found.push(entry.map_err(|e| BuildError::Io(e.into_error()))?);
  }
  found.sort();
  Ok(found)
}

/// The single path matching `pattern`.
///
/// Zero matches and several matches are both [`BuildError::ArtifactMissing`]:
/// picking one of several candidates silently could package the wrong file.
pub fn find_one(pattern: &str) -> Result<PathBuf, BuildError> {
  let mut found = find_all(pattern)?;
  if found.len() != 1 {
    return Err(BuildError::ArtifactMissing {
      pattern: pattern.to_string(),
      found: found.len(),
    });
  }
  Ok(found.remove(0))
}

/// Move `from` onto `to`, removing whatever was at `to` first.
pub async fn replace_file(from: &Path, to: &Path) -> Result<(), BuildError> {
  if fs::try_exists(to).await? {
    debug!(path = ?to, "removing previous artifact");
    fs::remove_file(to).await?;
  }
  fs::rename(from, to).await?;
  Ok(())
}

/// Write `contents` to a partial file next to `path`, then rename into place.
pub async fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), BuildError> {
  let temp_path = partial_path(path);
  fs::write(&temp_path, contents).await?;
  fs::rename(&temp_path, path).await?;
  Ok(())
}

/// Remove a directory tree if it exists.
pub async fn remove_dir_if_exists(dir: &Path) -> Result<(), BuildError> {
  match fs::remove_dir_all(dir).await {
    Ok(()) => {
      debug!(path = ?dir, "removed directory");
      Ok(())
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e.into()),
  }
}

/// Remove a file if it exists.
pub async fn remove_file_if_exists(path: &Path) -> Result<(), BuildError> {
  match fs::remove_file(path).await {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e.into()),
  }
}
