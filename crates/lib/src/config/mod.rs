//! Settings file, area registry and small value parsers.
//!
//! Settings live in a TOML file. Every field has a default, so a missing file
//! yields a working layout rooted in the current directory. Relative paths in
//! the file are resolved against the directory the file lives in.

pub mod areas;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{AREAS_FILENAME, AUTHOR_TAG, CONFIG_ENV, CONFIG_FILENAME};
use crate::context::BuildPaths;
use crate::pipeline::StageConfigs;
use crate::platform::Platform;
use crate::platform::paths::config_dir;
use crate::stage::{ContourConfig, CropConfig, DownloadConfig, MapBuildConfig, SplitConfig};
use crate::templates::LICENSE_TEMPLATE;

pub use areas::{AreaEntry, AreaRegistry};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid code page '{0}' (expected unicode, ascii or a number)")]
  InvalidCodePage(String),

  #[error("invalid download mode '{0}' (expected force, skip or auto)")]
  InvalidDownloadMode(String),

  #[error("invalid data age '{0}' (expected [0-9]+[hdm], e.g. 12h, 1d, 2m)")]
  InvalidDataAge(String),

  #[error("unknown area '{0}'")]
  UnknownArea(String),

  #[error("area '{0}' is defined more than once")]
  DuplicateArea(String),

  #[error("area '{id}' has number {number}, which does not fit four digits")]
  InvalidAreaNumber { id: String, number: u32 },
}

/// Working and resource directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirSettings {
  pub temp: PathBuf,
  pub pbf: PathBuf,
  pub img: PathBuf,
  pub hgt: PathBuf,
  /// Holds the precompiled sea tiles in its `sea` subdirectory.
  pub sea: PathBuf,
  pub polygons: PathBuf,
  pub bounds: PathBuf,
}

impl Default for DirSettings {
  fn default() -> Self {
    Self {
      temp: "temp".into(),
      pbf: "pbf".into(),
      img: "img".into(),
      hgt: "hgt".into(),
      sea: "sea".into(),
      polygons: "polygons".into(),
      bounds: "bounds.zip".into(),
    }
  }
}

/// External tools and their resource files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
  pub java: PathBuf,
  pub java_memory: String,
  pub splitter_jar: PathBuf,
  pub mkgmap_jar: PathBuf,
  pub contour: PathBuf,
  /// Directory holding the per-platform osmconvert binaries.
  pub convert_dir: PathBuf,
  /// Exact convert binary, bypassing the per-platform choice.
  pub convert: Option<PathBuf>,
  pub mkgmap_settings: PathBuf,
  pub style: PathBuf,
  /// File with license text; the built-in text is used when unset.
  pub license_template: Option<PathBuf>,
  /// Compiler threads; all cores when unset.
  pub max_jobs: Option<usize>,
}

impl Default for ToolSettings {
  fn default() -> Self {
    let split = SplitConfig::default();
    let build = MapBuildConfig::default();
    Self {
      java: split.java,
      java_memory: split.java_memory,
      splitter_jar: split.jar,
      mkgmap_jar: build.jar,
      contour: ContourConfig::default().program,
      convert_dir: "osmconvert".into(),
      convert: None,
      mkgmap_settings: build.settings,
      style: build.style,
      license_template: None,
      max_jobs: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  /// Product version written into the map and the manifest.
  pub version: u32,
  /// Area registry file.
  pub areas: PathBuf,
  pub dirs: DirSettings,
  pub tools: ToolSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      version: 100,
      areas: AREAS_FILENAME.into(),
      dirs: DirSettings::default(),
      tools: ToolSettings::default(),
    }
  }
}

impl Settings {
  /// Parse settings text; relative paths are resolved against `base`.
  pub fn from_toml(text: &str, origin: &Path, base: &Path) -> Result<Self, ConfigError> {
    let settings: Settings = toml::from_str(text).map_err(|source| ConfigError::Parse {
      path: origin.to_path_buf(),
      source,
    })?;
    Ok(settings.resolved(base))
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = read(path)?;
    let base = path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .map(|p| dunce::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()))
      .unwrap_or_else(current_dir);
    Self::from_toml(&text, path, &base)
  }

  /// Find and load the settings file.
  ///
  /// Looks at `explicit`, then `$GMAPMAKER_CONFIG`, then `./gmapmaker.toml`,
  /// then the user config directory. Returns defaults rooted in the current
  /// directory, and `None` as the source, when none of them exists.
  pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
      return Ok((Self::load(path)?, Some(path.to_path_buf())));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
      let path = PathBuf::from(path);
      return Ok((Self::load(&path)?, Some(path)));
    }

    let candidates = [Some(PathBuf::from(CONFIG_FILENAME)), config_dir().map(|d| d.join(CONFIG_FILENAME))];
    for path in candidates.into_iter().flatten() {
      if path.is_file() {
        debug!(path = ?path, "using settings file");
        return Ok((Self::load(&path)?, Some(path)));
      }
    }

    Ok((Self::default().resolved(&current_dir()), None))
  }

  fn resolved(mut self, base: &Path) -> Self {
    let join = |p: &mut PathBuf| {
      if p.is_relative() {
        *p = base.join(&*p);
      }
    };

    join(&mut self.areas);
    let dirs = &mut self.dirs;
    for p in [
      &mut dirs.temp,
      &mut dirs.pbf,
      &mut dirs.img,
      &mut dirs.hgt,
      &mut dirs.sea,
      &mut dirs.polygons,
      &mut dirs.bounds,
    ] {
      join(p);
    }

    // Bare program names stay as they are so they are looked up on PATH.
    let tools = &mut self.tools;
    for p in [
      &mut tools.splitter_jar,
      &mut tools.mkgmap_jar,
      &mut tools.convert_dir,
      &mut tools.mkgmap_settings,
      &mut tools.style,
    ] {
      join(p);
    }
    for p in [tools.convert.as_mut(), tools.license_template.as_mut()].into_iter().flatten() {
      join(p);
    }

    self
  }

  pub fn build_paths(&self) -> BuildPaths {
    BuildPaths {
      temp: self.dirs.temp.clone(),
      pbf: self.dirs.pbf.clone(),
      img: self.dirs.img.clone(),
      hgt: self.dirs.hgt.clone(),
      sea: self.dirs.sea.clone(),
      bounds: self.dirs.bounds.clone(),
    }
  }

  /// Stage configuration for the standard pipeline.
  ///
  /// Reads the license template file when one is configured.
  pub fn stage_configs(&self, download: DownloadConfig, platform: Platform) -> Result<StageConfigs, ConfigError> {
    let tools = &self.tools;

    let license_template = match &tools.license_template {
      Some(path) => read(path)?.trim_end().to_string(),
      None => LICENSE_TEMPLATE.to_string(),
    };

    let mut crop = CropConfig::for_platform(platform, &tools.convert_dir);
    if let Some(program) = &tools.convert {
      crop.program = program.clone();
    }

    let map_build_defaults = MapBuildConfig::default();
    Ok(StageConfigs {
      download,
      contour: ContourConfig {
        program: tools.contour.clone(),
        ..ContourConfig::default()
      },
      crop,
      split: SplitConfig {
        java: tools.java.clone(),
        java_memory: tools.java_memory.clone(),
        jar: tools.splitter_jar.clone(),
        ..SplitConfig::default()
      },
      map_build: MapBuildConfig {
        java: tools.java.clone(),
        java_memory: tools.java_memory.clone(),
        jar: tools.mkgmap_jar.clone(),
        settings: tools.mkgmap_settings.clone(),
        style: tools.style.clone(),
        max_jobs: tools.max_jobs.unwrap_or(map_build_defaults.max_jobs),
        license_template,
        ..map_build_defaults
      },
    })
  }
}

fn read(path: &Path) -> Result<String, ConfigError> {
  std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })
}

fn current_dir() -> PathBuf {
  std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Parse a data age such as `12h`, `1d` or `2m` (a month is 30 days).
pub fn parse_data_age(value: &str) -> Result<Duration, ConfigError> {
  let invalid = || ConfigError::InvalidDataAge(value.to_string());

  let unit = value.chars().last().ok_or_else(invalid)?;
  let digits = &value[..value.len() - unit.len_utf8()];
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return Err(invalid());
  }
  let count: u64 = digits.parse().map_err(|_| invalid())?;

  let hours = match unit {
    'h' => 1,
    'd' => 24,
    'm' => 24 * 30,
    _ => return Err(invalid()),
  };
  count
    .checked_mul(hours * 3600)
    .map(Duration::from_secs)
    .ok_or_else(invalid)
}

/// Map name suffix, always ending with the author tag.
pub fn map_suffix(custom: Option<&str>) -> String {
  match custom {
    Some(s) if !s.is_empty() => format!("_{}_{}", s, AUTHOR_TAG),
    _ => format!("_{}", AUTHOR_TAG),
  }
}
