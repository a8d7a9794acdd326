//! Compiling the final map image.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::{Stage, StageOutcome};
use crate::artifact::{replace_file, write_atomic};
use crate::context::{BuildContext, MapInputs};
use crate::error::BuildError;
use crate::process::{ToolInvocation, ToolRunner};
use crate::templates::{LICENSE_TEMPLATE, ScriptKind, render_license, render_script};

/// Image the compiler writes into its output directory.
pub const COMPILER_OUTPUT: &str = "gmapsupp.img";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapBuildConfig {
  pub java: PathBuf,
  pub java_memory: String,
  pub jar: PathBuf,
  /// Compiler option file (`-c`).
  pub settings: PathBuf,
  /// TYP/style file appended after the inputs.
  pub style: PathBuf,
  /// Precompiled sea tiles below the sea dir.
  pub sea_subdir: String,
  /// Elevation data directory below the hgt dir.
  pub dem_subdir: String,
  pub max_jobs: usize,
  pub license_template: String,
}

impl Default for MapBuildConfig {
  fn default() -> Self {
    Self {
      java: PathBuf::from("java"),
      java_memory: "-Xmx4g".to_string(),
      jar: PathBuf::from("mkgmap").join("mkgmap.jar"),
      settings: PathBuf::from("garmin-style").join("mkgmap-settings.conf"),
      style: PathBuf::from("garmin-style").join("style.txt"),
      sea_subdir: "sea".to_string(),
      dem_subdir: "VIEW3".to_string(),
      max_jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
      license_template: LICENSE_TEMPLATE.to_string(),
    }
  }
}

/// Runs mkgmap and places `<img>/<id><suffix>.img` with its installer scripts.
///
/// Always runs: its inputs may have changed in any earlier stage.
#[derive(Debug, Clone, Default)]
pub struct MapBuildStage {
  config: MapBuildConfig,
}

impl MapBuildStage {
  pub fn new(config: MapBuildConfig) -> Self {
    Self { config }
  }

  pub fn invocation(&self, ctx: &BuildContext, inputs: &MapInputs) -> ToolInvocation {
    let c = &self.config;
    let area = &ctx.area;
    let number = area.padded_number();
    let title = format!("{}{}", area.name, ctx.suffix);

    let mut inv = ToolInvocation::new(&c.java)
      .arg(&c.java_memory)
      .arg("-jar")
      .arg(&c.jar)
      .arg("-c")
      .arg(&c.settings)
      .arg(format!("--bounds={}", ctx.paths.bounds.display()))
      .arg(format!("--precomp-sea={}", ctx.paths.sea.join(&c.sea_subdir).display()))
      .arg(format!("--dem={}", ctx.paths.hgt.join(&c.dem_subdir).display()))
      .arg(format!("--max-jobs={}", c.max_jobs))
      .arg(format!("--mapname={}0001", number))
      .arg(format!("--overview-mapnumber={}0000", number))
      .arg(format!("--family-id={}", number))
      .arg(format!("--description={}", title))
      .arg(format!("--family-name={}", title))
      .arg(format!("--series-name={}", title))
      .arg(format!("--area-name={}", title))
      .arg(format!("--country-name={}", title))
      .arg(format!("--country-abbr={}", area.id))
      .arg(format!("--region-name={}", title))
      .arg(format!("--region-abbr={}", area.id))
      .arg(format!("--product-version={}", ctx.version))
      .arg(format!("--output-dir={}", ctx.output_dir().display()))
      .arg(format!("--dem-poly={}", area.polygon.display()))
      .arg(format!("--license-file={}", ctx.license_path().display()));

    if let Some(flag) = ctx.code_page.compiler_flag() {
      inv = inv.arg(flag);
    }

    inv
      .arg(&inputs.main)
      .arg(&inputs.contours)
      .arg(&c.style)
      .args(&area.pois)
  }
}

#[async_trait]
impl Stage for MapBuildStage {
  fn name(&self) -> &'static str {
    "map build"
  }

  async fn run(&self, ctx: &mut BuildContext, tools: &dyn ToolRunner) -> Result<StageOutcome, BuildError> {
    let output_dir = ctx.output_dir();
    // A bad family id must fail before the compiler runs.
    let mut scripts = Vec::new();
    for kind in ScriptKind::ALL {
      scripts.push((output_dir.join(kind.file_name()), render_script(kind, &ctx.area)?));
    }

    tokio::fs::create_dir_all(&output_dir).await?;
    tokio::fs::create_dir_all(&ctx.paths.temp).await?;

    write_atomic(
      &ctx.license_path(),
      render_license(&self.config.license_template, &ctx.area),
    )
    .await?;

    info!(area = %ctx.area.id, "compiling map");
    let inputs = ctx.map_inputs();
    tools.run(&self.invocation(ctx, &inputs)).await?;

    let mut produced = Vec::new();
    for (path, script) in scripts {
      write_atomic(&path, script).await?;
      produced.push(path);
    }

    let compiled = output_dir.join(COMPILER_OUTPUT);
    if !compiled.is_file() {
      return Err(BuildError::missing(&compiled));
    }
    let img = ctx.img_path();
    replace_file(&compiled, &img).await?;
    info!(path = ?img, "map image ready");

    produced.insert(0, img);
    Ok(StageOutcome::Ran(produced))
  }
}
