//! Fetching source map data.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{Stage, StageOutcome};
use crate::artifact::{ArtifactRecord, partial_path, replace_file};
use crate::config::ConfigError;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::process::ToolRunner;

/// When to fetch fresh source data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadMode {
  /// Always download.
  Force,
  /// Never download; local data must exist.
  Skip,
  /// Download when local data is missing or older than the maximum age.
  #[default]
  Auto,
}

impl DownloadMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Force => "force",
      Self::Skip => "skip",
      Self::Auto => "auto",
    }
  }
}

impl fmt::Display for DownloadMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for DownloadMode {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "force" | "f" => Ok(Self::Force),
      "skip" | "s" => Ok(Self::Skip),
      "auto" | "a" => Ok(Self::Auto),
      _ => Err(ConfigError::InvalidDownloadMode(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
  pub mode: DownloadMode,
  pub max_age: Duration,
}

impl Default for DownloadConfig {
  fn default() -> Self {
    Self {
      mode: DownloadMode::Auto,
      max_age: Duration::from_secs(24 * 60 * 60),
    }
  }
}

/// Keeps `<pbf>/<id>.osm.pbf` fresh.
#[derive(Debug, Clone, Default)]
pub struct DownloadStage {
  config: DownloadConfig,
  client: reqwest::Client,
}

impl DownloadStage {
  pub fn new(config: DownloadConfig) -> Self {
    Self {
      config,
      client: reqwest::Client::new(),
    }
  }

  /// Whether existing data at `path` is recent enough for auto mode.
  fn is_fresh(&self, record: &ArtifactRecord, now: SystemTime) -> bool {
    match record.age(now) {
      Some(age) => {
        debug!(path = ?record.path, age_secs = age.as_secs(), "local data age");
        age < self.config.max_age
      }
      // unknown or future mtime: trust the file
      None => true,
    }
  }

  async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, BuildError> {
    let failed = |message: String| BuildError::Download {
      url: url.to_string(),
      message,
    };

    let mut response = self.client.get(url).send().await.map_err(|e| failed(e.to_string()))?;
    if !response.status().is_success() {
      return Err(failed(format!("HTTP {}", response.status())));
    }

    let partial = partial_path(dest);
    let mut file = fs::File::create(&partial).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
      file.write_all(&chunk).await?;
      written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    replace_file(&partial, dest).await?;
    Ok(written)
  }
}

#[async_trait]
impl Stage for DownloadStage {
  fn name(&self) -> &'static str {
    "download"
  }

  async fn run(&self, ctx: &mut BuildContext, _tools: &dyn ToolRunner) -> Result<StageOutcome, BuildError> {
    let target = ctx.source_path();
    let existing = ArtifactRecord::probe(&target);

    let needed = match (self.config.mode, &existing) {
      (DownloadMode::Force, _) => true,
      (DownloadMode::Skip, None) => return Err(BuildError::missing(&target)),
      (DownloadMode::Skip, Some(_)) => false,
      (DownloadMode::Auto, None) => true,
      (DownloadMode::Auto, Some(record)) => !self.is_fresh(record, SystemTime::now()),
    };

    if !needed {
      info!(path = ?target, "using local map data");
      ctx.map_data = target;
      return Ok(StageOutcome::Skipped);
    }

    let url = ctx
      .area
      .url
      .clone()
      .ok_or_else(|| BuildError::precondition(format!("area {} has no download URL", ctx.area.id)))?;

    fs::create_dir_all(&ctx.paths.pbf).await?;
    info!(area = %ctx.area.id, url = %url, "downloading map data");
    let size = self.fetch(&url, &target).await?;
    info!(path = ?target, size, "download complete");

    ctx.downloaded = true;
    ctx.map_data = target.clone();
    Ok(StageOutcome::Ran(vec![target]))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{FakeTools, test_context, touch};

  fn stage(mode: DownloadMode) -> DownloadStage {
    DownloadStage::new(DownloadConfig {
      mode,
      ..Default::default()
    })
  }

  #[test]
  fn mode_parsing_accepts_short_forms() {
    assert_eq!("f".parse::<DownloadMode>().unwrap(), DownloadMode::Force);
    assert_eq!("Skip".parse::<DownloadMode>().unwrap(), DownloadMode::Skip);
    assert_eq!("a".parse::<DownloadMode>().unwrap(), DownloadMode::Auto);
    assert!("sometimes".parse::<DownloadMode>().is_err());
  }

  #[tokio::test]
  async fn force_downloads_into_place() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/czech-republic-latest.osm.pbf")
      .with_status(200)
      .with_body("fresh pbf")
      .create_async()
      .await;
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    touch(&ctx.source_path());
    ctx.area.url = Some(format!("{}/czech-republic-latest.osm.pbf", server.url()));

    let outcome = stage(DownloadMode::Force)
      .run(&mut ctx, &FakeTools::succeeding())
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(outcome, StageOutcome::Ran(vec![ctx.source_path()]));
    assert_eq!(std::fs::read(ctx.source_path()).unwrap(), b"fresh pbf");
    assert!(!partial_path(&ctx.source_path()).exists());
    assert!(ctx.downloaded);
  }

  #[tokio::test]
  async fn auto_keeps_fresh_data() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("GET", "/data.osm.pbf").expect(0).create_async().await;
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    touch(&ctx.source_path());
    ctx.area.url = Some(format!("{}/data.osm.pbf", server.url()));

    let outcome = stage(DownloadMode::Auto)
      .run(&mut ctx, &FakeTools::succeeding())
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(outcome, StageOutcome::Skipped);
    assert!(!ctx.downloaded);
  }

  #[tokio::test]
  async fn auto_downloads_missing_data() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/data.osm.pbf")
      .with_body("pbf")
      .create_async()
      .await;
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    ctx.area.url = Some(format!("{}/data.osm.pbf", server.url()));

    stage(DownloadMode::Auto)
      .run(&mut ctx, &FakeTools::succeeding())
      .await
      .unwrap();

    mock.assert_async().await;
    assert!(ctx.downloaded);
  }

  #[test]
  fn freshness_is_bounded_by_max_age() {
    let stage = DownloadStage::new(DownloadConfig {
      mode: DownloadMode::Auto,
      max_age: Duration::from_secs(3600),
    });
    let now = SystemTime::now();
    let record = |age| ArtifactRecord {
      path: "CZ01.osm.pbf".into(),
      digest: None,
      modified: Some(now - Duration::from_secs(age)),
    };

    assert!(stage.is_fresh(&record(60), now));
    assert!(!stage.is_fresh(&record(3600), now));
    assert!(!stage.is_fresh(&record(7200), now));
  }

  #[tokio::test]
  async fn skip_without_local_data_fails() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());

    let err = stage(DownloadMode::Skip)
      .run(&mut ctx, &FakeTools::succeeding())
      .await
      .unwrap_err();

    assert!(matches!(err, BuildError::ArtifactMissing { .. }));
  }

  #[tokio::test]
  async fn http_error_leaves_previous_data() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/gone.osm.pbf").with_status(404).create_async().await;
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    touch(&ctx.source_path());
    ctx.area.url = Some(format!("{}/gone.osm.pbf", server.url()));

    let err = stage(DownloadMode::Force)
      .run(&mut ctx, &FakeTools::succeeding())
      .await
      .unwrap_err();

    assert!(matches!(err, BuildError::Download { .. }));
    assert!(err.to_string().contains("404"));
    assert_eq!(std::fs::read(ctx.source_path()).unwrap(), b"data");
    assert!(!ctx.downloaded);
  }

  #[tokio::test]
  async fn missing_url_is_a_precondition_error() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());

    let err = stage(DownloadMode::Force)
      .run(&mut ctx, &FakeTools::succeeding())
      .await
      .unwrap_err();

    assert!(matches!(err, BuildError::Precondition { .. }));
  }
}
