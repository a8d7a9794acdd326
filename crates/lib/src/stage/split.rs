//! Splitting map data and contours into tiles the compiler can handle.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{Stage, StageOutcome};
use crate::artifact::{partial_path, remove_dir_if_exists};
use crate::context::{BuildContext, MapInputs};
use crate::error::BuildError;
use crate::process::{ToolInvocation, ToolRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConfig {
  pub java: PathBuf,
  /// Heap flag passed to the JVM, e.g. `-Xmx4g`.
  pub java_memory: String,
  pub jar: PathBuf,
  pub max_areas: u32,
  pub max_nodes: u32,
}

impl Default for SplitConfig {
  fn default() -> Self {
    Self {
      java: PathBuf::from("java"),
      java_memory: "-Xmx4g".to_string(),
      jar: PathBuf::from("splitter").join("splitter.jar"),
      max_areas: 4096,
      max_nodes: 1_600_000,
    }
  }
}

/// Produces `<pbf>/<id>-SPLITTED` and `<pbf>/<id>-SPLITTED-SRTM`.
///
/// The halves are cached independently. Contours never change with fresh
/// source data, so only the main half is invalidated by a download.
#[derive(Debug, Clone, Default)]
pub struct SplitStage {
  config: SplitConfig,
}

impl SplitStage {
  pub fn new(config: SplitConfig) -> Self {
    Self { config }
  }

  pub fn invocation(&self, input: &Path, output_dir: &Path) -> ToolInvocation {
    let c = &self.config;
    ToolInvocation::new(&c.java)
      .arg(&c.java_memory)
      .arg("-jar")
      .arg(&c.jar)
      .arg(input)
      .arg(format!("--max-areas={}", c.max_areas))
      .arg(format!("--max-nodes={}", c.max_nodes))
      .arg(format!("--output-dir={}", output_dir.display()))
  }

  async fn split(&self, tools: &dyn ToolRunner, input: &Path, dest: &Path) -> Result<(), BuildError> {
    if !input.is_file() {
      return Err(BuildError::missing(input));
    }

    let partial = partial_path(dest);
    remove_dir_if_exists(dest).await?;
    remove_dir_if_exists(&partial).await?;
    tokio::fs::create_dir_all(&partial).await?;

    info!(input = ?input, "splitting");
    tools.run(&self.invocation(input, &partial)).await?;
    tokio::fs::rename(&partial, dest).await?;
    Ok(())
  }
}

/// Pattern handed to the compiler for every tile in `dir`.
fn tiles(dir: &Path) -> String {
  dir.join("*.osm.pbf").display().to_string()
}

#[async_trait]
impl Stage for SplitStage {
  fn name(&self) -> &'static str {
    "split"
  }

  async fn run(&self, ctx: &mut BuildContext, tools: &dyn ToolRunner) -> Result<StageOutcome, BuildError> {
    if !ctx.flags.split {
      ctx.map_inputs = Some(MapInputs {
        main: ctx.map_data.display().to_string(),
        contours: ctx.contour_path().display().to_string(),
      });
      return Ok(StageOutcome::Skipped);
    }

    let mut produced = Vec::new();

    let main_dir = ctx.split_dir();
    if main_dir.is_dir() && !ctx.downloaded {
      info!(path = ?main_dir, "using previously split map data");
    } else {
      self.split(tools, &ctx.map_data, &main_dir).await?;
      produced.push(main_dir.clone());
    }

    let contour_dir = ctx.split_contour_dir();
    if contour_dir.is_dir() {
      info!(path = ?contour_dir, "using previously split contours");
    } else {
      self.split(tools, &ctx.contour_path(), &contour_dir).await?;
      produced.push(contour_dir.clone());
    }

    ctx.map_inputs = Some(MapInputs {
      main: tiles(&main_dir),
      contours: tiles(&contour_dir),
    });

    if produced.is_empty() {
      Ok(StageOutcome::Skipped)
    } else {
      Ok(StageOutcome::Ran(produced))
    }
  }
}
