//! Zip archive of the compiler output directory.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::partial_path;
use crate::error::BuildError;

/// Archive `root/dir_name` into `dest`, with entry names relative to `root`.
///
/// Directory entries are included so an empty directory survives. The archive
/// is written to a partial file and renamed onto `dest` once finished.
pub fn zip_dir(root: &Path, dir_name: &str, dest: &Path) -> Result<u64, BuildError> {
  let source = root.join(dir_name);
  if !source.is_dir() {
    return Err(BuildError::missing(&source));
  }

  let partial = partial_path(dest);
  let mut zip = ZipWriter::new(BufWriter::new(File::create(&partial)?));
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  let mut entries = 0u64;
  for entry in WalkDir::new(&source).sort_by_file_name() {
    let entry = entry.map_err(|e| BuildError::Io(e.into()))?;
    let path = entry.path();
    let name = entry_name(root, path)?;

    if entry.file_type().is_dir() {
      zip.add_directory(name, options)?;
    } else {
      let len = entry.metadata().map_err(|e| BuildError::Io(e.into()))?.len();
      zip.start_file(name, options.large_file(len > u32::MAX as u64))?;
      io::copy(&mut File::open(path)?, &mut zip)?;
    }
    entries += 1;
  }

  let mut writer = zip.finish()?;
  io::Write::flush(&mut writer)?;
  drop(writer);

  if dest.exists() {
    std::fs::remove_file(dest)?;
  }
  std::fs::rename(&partial, dest)?;
  debug!(path = ?dest, entries, "archive written");
  Ok(entries)
}

/// Zip entry name for `path`: relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Result<String, BuildError> {
  let relative = path
    .strip_prefix(root)
    .map_err(|_| BuildError::precondition(format!("{} is outside {}", path.display(), root.display())))?;
  let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
  Ok(parts.join("/"))
}
