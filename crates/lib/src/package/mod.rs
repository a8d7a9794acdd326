//! Packaging of a finished map.
//!
//! After the map build, the compiler output directory is archived, the image
//! and the archive are digested and the manifest is written. Each output goes
//! through a partial file, so the `.info` only ever describes complete files.

pub mod archive;
pub mod manifest;

use std::path::Path;

use tracing::info;

use crate::artifact::write_atomic;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::util::hash::{ContentHash, hash_file};

pub use manifest::BuildManifest;

#[derive(Debug, Clone, Copy, Default)]
pub struct Packager;

impl Packager {
  /// Write `<id><suffix>.zip` and `<id><suffix>.info` next to the image.
  pub async fn package(&self, ctx: &BuildContext) -> Result<BuildManifest, BuildError> {
    let img = ctx.img_path();
    if !img.is_file() {
      return Err(BuildError::missing(&img));
    }

    let root = ctx.paths.img.clone();
    let dir_name = ctx.map_name();
    let zip = ctx.zip_path();
    info!(path = ?zip, "archiving map");
    blocking({
      let zip = zip.clone();
      move || archive::zip_dir(&root, &dir_name, &zip)
    })
    .await?;

    let hash_img = digest(&img).await?;
    let hash_zip = digest(&zip).await?;

    let manifest = BuildManifest::new(ctx, &hash_img, &hash_zip);
    write_atomic(&ctx.info_path(), manifest.to_json()?).await?;
    info!(path = ?ctx.info_path(), hash_img = %hash_img, "manifest written");

    Ok(manifest)
  }
}

async fn digest(path: &Path) -> Result<ContentHash, BuildError> {
  let path = path.to_path_buf();
  blocking(move || hash_file(&path).map_err(BuildError::from)).await
}

/// Run synchronous file work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, BuildError>
where
  F: FnOnce() -> Result<T, BuildError> + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(f)
    .await
    .map_err(|e| BuildError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::hash::hash_bytes;
  use crate::util::testutil::{test_context, touch};

  #[tokio::test]
  async fn writes_archive_and_manifest() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = test_context(temp.path());
    std::fs::write(ctx.img_path(), b"image").unwrap();
    touch(&ctx.output_dir().join("install.bat"));

    let manifest = Packager.package(&ctx).await.unwrap();

    assert_eq!(manifest.hash_img, hash_bytes(b"image").to_string());
    assert_eq!(manifest.hash_zip, hash_file(&ctx.zip_path()).unwrap().to_string());

    let written = std::fs::read_to_string(ctx.info_path()).unwrap();
    assert_eq!(BuildManifest::from_json(&written).unwrap(), manifest);
  }

  #[tokio::test]
  async fn image_digest_is_sha1_hex() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = test_context(temp.path());
    std::fs::write(ctx.img_path(), b"image").unwrap();
    touch(&ctx.output_dir().join("install.bat"));

    let manifest = Packager.package(&ctx).await.unwrap();

    assert_eq!(manifest.hash_img, "0e76292794888d4f1fa75fb3aff4ca27c58f56a6");
    assert_eq!(manifest.hash_zip.len(), 40);
  }

  #[tokio::test]
  async fn missing_image_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = test_context(temp.path());
    touch(&ctx.output_dir().join("install.bat"));

    let err = Packager.package(&ctx).await.unwrap_err();

    assert!(matches!(err, BuildError::ArtifactMissing { .. }));
    assert!(!ctx.zip_path().exists());
    assert!(!ctx.info_path().exists());
  }

  #[tokio::test]
  async fn missing_output_dir_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let ctx = test_context(temp.path());
    std::fs::write(ctx.img_path(), b"image").unwrap();

    let err = Packager.package(&ctx).await.unwrap_err();

    assert!(matches!(err, BuildError::ArtifactMissing { .. }));
    assert!(!ctx.info_path().exists());
  }
}
