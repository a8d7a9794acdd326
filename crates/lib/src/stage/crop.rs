//! Cropping source data to the area polygon.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Stage, StageOutcome};
use crate::artifact::{partial_path, replace_file};
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::platform::{Arch, Os, Platform};
use crate::process::{ToolInvocation, ToolRunner};

/// Largest input the 32-bit Windows convert tool can address.
pub const CROP_SIZE_LIMIT: u64 = 2_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropConfig {
  pub program: PathBuf,
  /// Inputs at or over this many bytes are refused before the tool runs.
  pub size_limit: Option<u64>,
}

impl CropConfig {
  /// Convert tool shipped under `tool_dir` for the given platform.
  pub fn for_platform(platform: Platform, tool_dir: impl Into<PathBuf>) -> Self {
    let limited = platform.os == Os::Windows && platform.arch.bits() == 32;
    Self {
      program: tool_dir.into().join(platform.osmconvert_name()),
      size_limit: limited.then_some(CROP_SIZE_LIMIT),
    }
  }
}

impl Default for CropConfig {
  fn default() -> Self {
    let platform = Platform::current().unwrap_or(Platform::new(Arch::X86_64, Os::Linux));
    Self::for_platform(platform, "osmconvert")
  }
}

/// Cuts the working map data down to `<temp>/<id>.osm.pbf`.
#[derive(Debug, Clone, Default)]
pub struct CropStage {
  config: CropConfig,
}

impl CropStage {
  pub fn new(config: CropConfig) -> Self {
    Self { config }
  }

  pub fn invocation(&self, ctx: &BuildContext, output: &Path) -> ToolInvocation {
    ToolInvocation::new(&self.config.program)
      .arg(&ctx.map_data)
      .arg(format!("-B={}", ctx.area.polygon.display()))
      .args([
        "--complete-ways",
        "--complete-multipolygons",
        "--complete-boundaries",
        "--out-pbf",
      ])
      .arg(format!("-o={}", output.display()))
  }
}

#[async_trait]
impl Stage for CropStage {
  fn name(&self) -> &'static str {
    "crop"
  }

  async fn run(&self, ctx: &mut BuildContext, tools: &dyn ToolRunner) -> Result<StageOutcome, BuildError> {
    if !ctx.crop_requested() {
      return Ok(StageOutcome::Skipped);
    }

    let input = ctx.map_data.clone();
    let size = match tokio::fs::metadata(&input).await {
      Ok(metadata) => metadata.len(),
      Err(_) => return Err(BuildError::missing(&input)),
    };

    if let Some(limit) = self.config.size_limit
      && size >= limit
    {
      warn!(path = ?input, size, limit, "input too large for crop tool");
      return Err(BuildError::precondition(format!(
        "file for crop is too big ({:.2} GB), maximum is {:.2} GB",
        size as f64 / 1e9,
        limit as f64 / 1e9
      )));
    }

    let output = ctx.cropped_path();
    let partial = partial_path(&output);
    info!(area = %ctx.area.id, path = ?input, "cropping map data");
    tools.run(&self.invocation(ctx, &partial)).await?;

    if !partial.is_file() {
      return Err(BuildError::missing(&partial));
    }
    replace_file(&partial, &output).await?;

    ctx.map_data = output.clone();
    Ok(StageOutcome::Ran(vec![output]))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::process::ExecutionResult;
  use crate::util::testutil::{FakeTools, test_context, touch};

  fn writes_output() -> FakeTools {
    FakeTools::with(|inv| {
      let out = inv.arg_value("-o=").unwrap();
      touch(&PathBuf::from(out));
      Ok(ExecutionResult::default())
    })
  }

  fn limited(limit: u64) -> CropStage {
    CropStage::new(CropConfig {
      program: PathBuf::from("osmconvert32.exe"),
      size_limit: Some(limit),
    })
  }

  #[tokio::test]
  async fn skipped_unless_requested() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    let tools = FakeTools::succeeding();

    let outcome = CropStage::default().run(&mut ctx, &tools).await.unwrap();

    assert_eq!(outcome, StageOutcome::Skipped);
    assert!(tools.calls().is_empty());
    assert_eq!(ctx.map_data, ctx.source_path());
  }

  #[tokio::test]
  async fn area_flag_requests_crop_and_rewrites_map_data() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    ctx.area.crop = true;
    touch(&ctx.source_path());
    let tools = writes_output();

    let outcome = CropStage::default().run(&mut ctx, &tools).await.unwrap();

    assert_eq!(outcome, StageOutcome::Ran(vec![ctx.cropped_path()]));
    assert_eq!(ctx.map_data, ctx.cropped_path());
    assert!(ctx.cropped_path().is_file());
    assert!(!partial_path(&ctx.cropped_path()).exists());

    let inv = &tools.calls()[0];
    assert!(inv.has_arg("--complete-multipolygons"));
    assert!(inv.has_arg("--out-pbf"));
  }

  #[tokio::test]
  async fn input_at_limit_fails_before_running() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    ctx.flags.crop = true;
    touch(&ctx.source_path());
    let tools = writes_output();

    // touch() writes four bytes
    let err = limited(4).run(&mut ctx, &tools).await.unwrap_err();

    assert!(matches!(err, BuildError::Precondition { .. }));
    assert!(err.to_string().contains("too big"));
    assert!(tools.calls().is_empty());
    assert_eq!(ctx.map_data, ctx.source_path());
  }

  #[tokio::test]
  async fn input_under_limit_runs() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    ctx.flags.crop = true;
    touch(&ctx.source_path());
    let tools = writes_output();

    let outcome = limited(5).run(&mut ctx, &tools).await.unwrap();

    assert!(!outcome.is_skipped());
    assert_eq!(tools.calls().len(), 1);
  }

  #[tokio::test]
  async fn missing_input_is_artifact_missing() {
    let temp = tempfile::tempdir().unwrap();
    let mut ctx = test_context(temp.path());
    ctx.flags.crop = true;

    let err = CropStage::default().run(&mut ctx, &FakeTools::succeeding()).await.unwrap_err();

    assert!(matches!(err, BuildError::ArtifactMissing { .. }));
  }

  #[test]
  fn size_limit_applies_only_to_32_bit_windows() {
    let win32 = CropConfig::for_platform(Platform::new(Arch::X86, Os::Windows), "osmconvert");
    assert_eq!(win32.size_limit, Some(CROP_SIZE_LIMIT));
    assert_eq!(win32.program, PathBuf::from("osmconvert").join("osmconvert32.exe"));

    let win64 = CropConfig::for_platform(Platform::new(Arch::X86_64, Os::Windows), "osmconvert");
    assert_eq!(win64.size_limit, None);

    let linux32 = CropConfig::for_platform(Platform::new(Arch::X86, Os::Linux), "osmconvert");
    assert_eq!(linux32.size_limit, None);
    assert_eq!(linux32.program, PathBuf::from("osmconvert").join("osmconvert32"));
  }
}
