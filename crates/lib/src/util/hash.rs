//! Content digests for produced artifacts.
//!
//! Map images and archives routinely run to several gigabytes, so files are
//! hashed in fixed chunks instead of being read into memory whole.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Chunk size for streaming file digests (64 MiB).
pub const DIGEST_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// SHA-1 digest of some content, as published next to every map.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (40 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while hashing a file.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Hash a file's contents.
///
/// Reads the file in [`DIGEST_CHUNK_SIZE`] chunks and returns the full
/// 40-character SHA-1 hash.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  hash_file_chunked(path, DIGEST_CHUNK_SIZE)
}

fn hash_file_chunked(path: &Path, chunk_size: usize) -> Result<ContentHash, HashError> {
  let read_error = |source| HashError::ReadFile {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_error)?;
  let len = file.metadata().map(|m| m.len() as usize).unwrap_or(chunk_size);

  let mut hasher = Sha1::new();
  // Small files never need the full chunk allocated.
  let mut buffer = vec![0u8; chunk_size.min(len.max(1))];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_error)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 40-character SHA-1 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha1::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}
