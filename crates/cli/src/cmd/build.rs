//! Implementation of the `gmapmaker build` command.
//!
//! Resolves the area and settings, takes the build lock, then runs the
//! standard pipeline with the real tool runner.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};
use tracing::info;

use gmapmaker_lib::build_lock::BuildLock;
use gmapmaker_lib::config::areas::check_number;
use gmapmaker_lib::config::{AreaRegistry, Settings, map_suffix};
use gmapmaker_lib::pipeline::{PipelineController, StageObserver};
use gmapmaker_lib::platform::Platform;
use gmapmaker_lib::process::{ConsoleSink, ProcessRunner};
use gmapmaker_lib::stage::{DownloadConfig, StageState};
use gmapmaker_lib::{BuildContext, BuildFlags};

use crate::BuildArgs;
use crate::output::{
  format_bytes, print_error, print_skipped, print_stage, print_stat, print_success, print_warning,
  truncate_hash,
};

/// Prints one line per stage as the pipeline advances.
struct Progress;

impl StageObserver for Progress {
  fn transition(&self, stage: &str, state: StageState) {
    match state {
      StageState::SkipCheck => print_stage(stage),
      StageState::Skipped => print_skipped(stage),
      StageState::Failed => print_error(&format!("{} failed", stage)),
      StageState::Succeeded => {}
    }
  }
}

pub fn cmd_build(args: &BuildArgs, config: Option<&Path>, quiet: bool) -> Result<()> {
  let started = Instant::now();
  let (settings, source) = Settings::discover(config).context("Failed to load settings")?;
  match &source {
    Some(path) => info!(path = %path.display(), "settings loaded"),
    None if !quiet => print_warning("No settings file found, using defaults"),
    None => {}
  }

  let registry = AreaRegistry::load(&settings.areas).context("Failed to load area registry")?;
  let entry = registry.get(&args.area)?;
  if let Some(number) = args.map_number {
    check_number(&entry.id, number)?;
  }
  let area = entry.descriptor(&settings.dirs.polygons, Utc::now().trunc_subsecs(0), args.map_number);

  let flags = BuildFlags {
    crop: args.crop,
    split: !args.no_split,
    quiet,
  };
  let mut ctx = BuildContext::new(
    area,
    settings.build_paths(),
    flags,
    args.code_page,
    settings.version,
    map_suffix(args.suffix.as_deref()),
  );

  for dir in [&ctx.paths.temp, &ctx.paths.pbf, &ctx.paths.img] {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  }
  let _lock = BuildLock::for_build(&ctx, "gmapmaker build")?;

  let platform = Platform::current().context("Unsupported platform")?;
  let download = DownloadConfig {
    mode: args.download,
    max_age: args.maximum_data_age,
  };
  let configs = settings.stage_configs(download, platform)?;

  let runner = ProcessRunner::new(Arc::new(ConsoleSink::new(quiet)));
  let mut controller = PipelineController::standard(configs, Arc::new(runner));
  if !quiet {
    controller = controller.with_observer(Arc::new(Progress));
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(controller.run(&mut ctx)).context("Build failed")?;

  if !quiet {
    println!();
    print_success(&format!("Map {} built", ctx.map_name()));
    let size = std::fs::metadata(ctx.img_path()).map(|m| m.len()).unwrap_or(0);
    print_stat("Image", &format!("{} ({})", ctx.img_path().display(), format_bytes(size)));
    print_stat("Archive", &ctx.zip_path().display().to_string());
    if let Some(manifest) = &report.manifest {
      print_stat("Image hash", truncate_hash(&manifest.hash_img));
      print_stat("Archive hash", truncate_hash(&manifest.hash_zip));
    }
    print_stat(
      "Stages",
      &format!("{} run, {} up to date", report.ran().count(), report.skipped().count()),
    );
    let elapsed = std::time::Duration::from_secs(started.elapsed().as_secs());
    print_stat("Elapsed", &humantime::format_duration(elapsed).to_string());
  }

  Ok(())
}
