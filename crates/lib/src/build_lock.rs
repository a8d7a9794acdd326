//! File-based lock keeping two builds from sharing one data directory.
//!
//! Builds share the pbf cache and the temp directory, so a second concurrent
//! run would clobber the first one's partial files. The lock is an advisory
//! exclusive lock on a file in the pbf directory; it is released when the
//! [`BuildLock`] is dropped, including when the process dies.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::BuildContext;
use crate::error::BuildError;

const LOCK_FILENAME: &str = ".gmapmaker.lock";

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at: DateTime<Utc>,
  pub command: String,
  pub area: String,
}

#[derive(Debug, Error)]
pub enum BuildLockError {
  #[error(
    "another build is running: {command} (area {area}, PID {pid}, started {started_at})\n\
             If you're sure no gmapmaker process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    area: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "another build is running (could not read lock metadata)\n\
             If you're sure no gmapmaker process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create lock directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

pub struct BuildLock {
  file: File,
  lock_path: PathBuf,
}

impl BuildLock {
  /// Take the lock in `dir`, recording who holds it.
  pub fn acquire(dir: &Path, command: &str, area: &str) -> Result<Self, BuildLockError> {
    let lock_path = dir.join(LOCK_FILENAME);

    if !dir.exists() {
      std::fs::create_dir_all(dir).map_err(BuildLockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(BuildLockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path));
      }
      return Err(BuildLockError::LockFailed(err));
    }

    Self::write_metadata(&file, command, area)?;
    Ok(BuildLock { file, lock_path })
  }

  fn write_metadata(file: &File, command: &str, area: &str) -> Result<(), BuildLockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at: Utc::now(),
      command: command.to_string(),
      area: area.to_string(),
    };

    file.set_len(0).map_err(BuildLockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata)
      .map_err(|e| BuildLockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(BuildLockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> BuildLockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return BuildLockError::Contention {
          command: metadata.command,
          area: metadata.area,
          pid: metadata.pid,
          started_at: metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    BuildLockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }

  /// Reads the metadata through the held handle.
  ///
  /// Opening the file again would fail on Windows, where locks are mandatory.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  /// Lock the pbf cache of `ctx` for one build of its area.
  pub fn for_build(ctx: &BuildContext, command: &str) -> Result<Self, BuildError> {
    Ok(Self::acquire(&ctx.paths.pbf, command, &ctx.area.id)?)
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
