//! Elevation contour generation.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Stage, StageOutcome};
use crate::artifact::{find_all, find_one, remove_file_if_exists};
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::process::{ToolInvocation, ToolRunner};

/// Fixed arguments for the contour generator (phyghtmap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourConfig {
  pub program: PathBuf,
  /// Parallel jobs (`-j`).
  pub jobs: u32,
  /// Contour line step in metres (`-s`).
  pub step: u32,
  /// Major and medium line categories (`-c`).
  pub categories: String,
  /// Elevation data source (`--source`).
  pub source: String,
  /// First node id, kept far above real OSM ids so tiles can be merged.
  pub start_node_id: u64,
  /// First way id, for the same reason.
  pub start_way_id: u64,
  /// 0 writes one file for the whole polygon.
  pub max_nodes_per_tile: u32,
}

impl Default for ContourConfig {
  fn default() -> Self {
    Self {
      program: PathBuf::from("phyghtmap"),
      jobs: 2,
      step: 10,
      categories: "200,100".to_string(),
      source: "view3".to_string(),
      start_node_id: 20_000_000_000,
      start_way_id: 10_000_000_000,
      max_nodes_per_tile: 0,
    }
  }
}

/// Generates `<pbf>/<id>-SRTM.osm.pbf` unless it already exists.
#[derive(Debug, Clone, Default)]
pub struct ContourStage {
  config: ContourConfig,
}

impl ContourStage {
  pub fn new(config: ContourConfig) -> Self {
    Self { config }
  }

  pub fn invocation(&self, ctx: &BuildContext) -> ToolInvocation {
    let c = &self.config;
    ToolInvocation::new(&c.program)
      .arg(format!("--polygon={}", ctx.area.polygon.display()))
      .arg("-o")
      .arg(ctx.contour_prefix())
      .arg("--pbf")
      .args(["-j".to_string(), c.jobs.to_string()])
      .args(["-s".to_string(), c.step.to_string()])
      .args(["-c".to_string(), c.categories.clone()])
      .arg(format!("--hgtdir={}", ctx.paths.hgt.display()))
      .arg(format!("--source={}", c.source))
      .arg(format!("--start-node-id={}", c.start_node_id))
      .arg(format!("--start-way-id={}", c.start_way_id))
      .arg("--write-timestamp")
      .arg(format!("--max-nodes-per-tile={}", c.max_nodes_per_tile))
  }
}

#[async_trait]
impl Stage for ContourStage {
  fn name(&self) -> &'static str {
    "contours"
  }

  async fn run(&self, ctx: &mut BuildContext, tools: &dyn ToolRunner) -> Result<StageOutcome, BuildError> {
    let canonical = ctx.contour_path();
    if canonical.is_file() {
      info!(path = ?canonical, "using previously generated contours");
      return Ok(StageOutcome::Skipped);
    }

    // Leftovers from an interrupted run would make the output ambiguous.
    let pattern = ctx.contour_pattern();
    for stale in find_all(&pattern)? {
      debug!(path = ?stale, "removing stale contour file");
      remove_file_if_exists(&stale).await?;
    }

    info!(area = %ctx.area.id, "generating contours");
    tools.run(&self.invocation(ctx)).await?;

    // The generator appends its own coordinate suffix to the output name.
    let generated = find_one(&pattern)?;
    tokio::fs::rename(&generated, &canonical).await?;

    info!(path = ?canonical, "contours ready");
    Ok(StageOutcome::Ran(vec![canonical]))
  }
}
