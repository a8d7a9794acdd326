//! Ordered execution of the build stages.
//!
//! The controller owns the stage list and the tool runner. It threads one
//! [`BuildContext`] through every stage, stops at the first error and returns
//! it unchanged. There is no retry and no resume: a failed run is simply run
//! again, and the stages' skip checks pick up whatever is still valid.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::package::{BuildManifest, Packager};
use crate::process::ToolRunner;
use crate::stage::{
  ContourConfig, ContourStage, CropConfig, CropStage, DownloadConfig, DownloadStage, MapBuildConfig, MapBuildStage,
  SplitConfig, SplitStage, Stage, StageOutcome, StageState,
};

/// Receives stage state transitions, e.g. to print progress.
pub trait StageObserver: Send + Sync {
  fn transition(&self, _stage: &str, _state: StageState) {}
}

/// Per-stage configuration for the standard pipeline.
#[derive(Debug, Clone, Default)]
pub struct StageConfigs {
  pub download: DownloadConfig,
  pub contour: ContourConfig,
  pub crop: CropConfig,
  pub split: SplitConfig,
  pub map_build: MapBuildConfig,
}

/// How one stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
  pub name: &'static str,
  pub state: StageState,
  pub artifacts: Vec<PathBuf>,
  pub elapsed: Duration,
}

/// Result of a successful run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
  pub stages: Vec<StageReport>,
  /// Present when the controller packaged the result.
  pub manifest: Option<BuildManifest>,
}

impl PipelineReport {
  pub fn ran(&self) -> impl Iterator<Item = &StageReport> {
    self.stages.iter().filter(|s| s.state == StageState::Succeeded)
  }

  pub fn skipped(&self) -> impl Iterator<Item = &StageReport> {
    self.stages.iter().filter(|s| s.state == StageState::Skipped)
  }
}

pub struct PipelineController {
  stages: Vec<Box<dyn Stage>>,
  tools: Arc<dyn ToolRunner>,
  packager: Option<Packager>,
  observer: Option<Arc<dyn StageObserver>>,
}

impl PipelineController {
  /// A controller with no stages.
  pub fn new(tools: Arc<dyn ToolRunner>) -> Self {
    Self {
      stages: Vec::new(),
      tools,
      packager: None,
      observer: None,
    }
  }

  /// Download, contour, crop, split and map build, followed by packaging.
  pub fn standard(configs: StageConfigs, tools: Arc<dyn ToolRunner>) -> Self {
    Self::new(tools)
      .with_stage(DownloadStage::new(configs.download))
      .with_stage(ContourStage::new(configs.contour))
      .with_stage(CropStage::new(configs.crop))
      .with_stage(SplitStage::new(configs.split))
      .with_stage(MapBuildStage::new(configs.map_build))
      .with_packager(Packager::default())
  }

  pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
    self.stages.push(Box::new(stage));
    self
  }

  pub fn with_packager(mut self, packager: Packager) -> Self {
    self.packager = Some(packager);
    self
  }

  pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
    self.observer = Some(observer);
    self
  }

  pub fn stage_names(&self) -> Vec<&'static str> {
    self.stages.iter().map(|s| s.name()).collect()
  }

  fn notify(&self, stage: &str, state: StageState) {
    if let Some(observer) = &self.observer {
      observer.transition(stage, state);
    }
  }

  /// Run every stage in order, then package.
  pub async fn run(&self, ctx: &mut BuildContext) -> Result<PipelineReport, BuildError> {
    let mut report = PipelineReport::default();
    info!(area = %ctx.area.id, stages = self.stages.len(), "starting build");

    for stage in &self.stages {
      let name = stage.name();
      let start = Instant::now();
      self.notify(name, StageState::SkipCheck);

      let outcome = match stage.run(ctx, self.tools.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
          error!(stage = name, error = %e, "stage failed");
          self.notify(name, StageState::Failed);
          return Err(e);
        }
      };

      let (state, artifacts) = match outcome {
        StageOutcome::Skipped => (StageState::Skipped, Vec::new()),
        StageOutcome::Ran(paths) => (StageState::Succeeded, paths),
      };
      let elapsed = start.elapsed();
      info!(stage = name, state = %state, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
      self.notify(name, state);

      report.stages.push(StageReport {
        name,
        state,
        artifacts,
        elapsed,
      });
    }

    if let Some(packager) = &self.packager {
      report.manifest = Some(packager.package(ctx).await?);
    }

    info!(area = %ctx.area.id, "build finished");
    Ok(report)
  }
}
