//! Pipeline stages.
//!
//! Each stage first decides from the filesystem (and the `downloaded` flag)
//! whether its output is still valid. If so it reports [`StageOutcome::Skipped`]
//! without touching anything; otherwise it runs its tool(s) and renames the
//! results to their canonical paths.
//!
//! # Submodules
//!
//! - [`download`] - fetch source data
//! - [`contour`] - generate elevation contours
//! - [`crop`] - cut source data down to the area polygon
//! - [`split`] - split data into compiler-sized tiles
//! - [`map_build`] - compile the map and its installer scripts

pub mod contour;
pub mod crop;
pub mod download;
pub mod map_build;
pub mod split;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::process::ToolRunner;

pub use contour::{ContourConfig, ContourStage};
pub use crop::{CROP_SIZE_LIMIT, CropConfig, CropStage};
pub use download::{DownloadConfig, DownloadMode, DownloadStage};
pub use map_build::{MapBuildConfig, MapBuildStage};
pub use split::{SplitConfig, SplitStage};

/// How a stage that did not fail finished.
///
/// Failure is the `Err` side of [`Stage::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
  /// Existing output was still valid; nothing was run or written.
  Skipped,
  /// Work was done; the canonical artifacts it produced.
  Ran(Vec<PathBuf>),
}

impl StageOutcome {
  pub fn is_skipped(&self) -> bool {
    matches!(self, Self::Skipped)
  }
}

/// Lifecycle of one stage within a run.
///
/// The skip decision and the work happen inside one [`Stage::run`] call, so
/// a stage goes from `SkipCheck` straight to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
  SkipCheck,
  Skipped,
  Succeeded,
  Failed,
}

impl StageState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::SkipCheck => "checking",
      Self::Skipped => "skipped",
      Self::Succeeded => "succeeded",
      Self::Failed => "failed",
    }
  }

  /// No further transitions follow.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Skipped | Self::Succeeded | Self::Failed)
  }
}

impl fmt::Display for StageState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One ordered unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
  /// Short name used in logs and reports.
  fn name(&self) -> &'static str;

  /// Decide skip-vs-run and, when running, produce the stage's artifacts.
  async fn run(&self, ctx: &mut BuildContext, tools: &dyn ToolRunner) -> Result<StageOutcome, BuildError>;
}
