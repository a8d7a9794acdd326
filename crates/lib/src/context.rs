//! Build-run state shared between pipeline stages.
//!
//! A [`BuildContext`] is created once per run by the caller and handed to
//! each stage by `&mut`. Stages mutate it only while they are the active stage
//! (crop rewrites the working data path, split records the map inputs,
//! download sets the `downloaded` flag).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One buildable area as supplied by the area registry. Read-only to the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDescriptor {
  /// Stable identifier, e.g. `CZ01`.
  pub id: String,
  /// Display name used inside the map and the installer scripts.
  pub name: String,
  /// Numeric product id (Garmin family id).
  pub number: u32,
  /// Bounding polygon in osmosis `.poly` format.
  pub polygon: PathBuf,
  /// Timestamp of the source data.
  pub timestamp: DateTime<Utc>,
  /// Point-of-interest overlay files appended to the map build.
  #[serde(default)]
  pub pois: Vec<PathBuf>,
  /// Always crop this area, even when cropping was not requested.
  #[serde(default)]
  pub crop: bool,
  /// Where to fetch source data from.
  #[serde(default)]
  pub url: Option<String>,
}

/// Layout of data timestamps in the license file and manifest.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

impl AreaDescriptor {
  /// Data timestamp as written into the license file and manifest,
  /// e.g. `2021-08-11 10:00:00+00:00`.
  pub fn datetime_text(&self) -> String {
    self.timestamp.format(DATETIME_FORMAT).to_string()
  }

  /// Four-digit zero-padded product id, e.g. `0136`.
  pub fn padded_number(&self) -> String {
    format!("{:04}", self.number)
  }
}

/// Working directories and shared resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
  /// Scratch space (polygon copies, cropped data, license file).
  pub temp: PathBuf,
  /// Cache of source data, contours and split tiles.
  pub pbf: PathBuf,
  /// Output directory for finished maps.
  pub img: PathBuf,
  /// Elevation (HGT) tiles.
  pub hgt: PathBuf,
  /// Root of the precompiled sea data; mkgmap reads its `sea` subdirectory.
  pub sea: PathBuf,
  /// Precompiled bounds archive.
  pub bounds: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildFlags {
  /// Crop the source data by the area polygon.
  pub crop: bool,
  /// Split data into tiles before compiling.
  pub split: bool,
  /// No console output.
  pub quiet: bool,
}

/// Text encoding of the compiled map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
  /// A fixed Windows code page such as 1250.
  Numeric(u16),
  /// UTF-8, which the compiler only accepts as code page 65001.
  Unicode,
  /// Plain ASCII: the compiler's default, no flag passed.
  Ascii,
}

impl CodePage {
  pub const UNICODE_CODE_PAGE: u16 = 65001;

  /// The `--code-page=` argument for the map compiler, if any.
  pub fn compiler_flag(&self) -> Option<String> {
    match self {
      Self::Numeric(code) => Some(format!("--code-page={}", code)),
      Self::Unicode => Some(format!("--code-page={}", Self::UNICODE_CODE_PAGE)),
      Self::Ascii => None,
    }
  }

  /// Value recorded in the build manifest.
  pub fn manifest_value(&self) -> String {
    match self {
      Self::Numeric(code) => code.to_string(),
      Self::Unicode => Self::UNICODE_CODE_PAGE.to_string(),
      Self::Ascii => "ascii".to_string(),
    }
  }
}

impl Default for CodePage {
  fn default() -> Self {
    Self::Numeric(1250)
  }
}

impl FromStr for CodePage {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "unicode" | "utf8" | "utf-8" => Ok(Self::Unicode),
      "ascii" => Ok(Self::Ascii),
      other => other
        .parse::<u16>()
        .map(Self::Numeric)
        .map_err(|_| ConfigError::InvalidCodePage(s.to_string())),
    }
  }
}

impl fmt::Display for CodePage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Numeric(code) => write!(f, "{}", code),
      Self::Unicode => write!(f, "unicode"),
      Self::Ascii => write!(f, "ascii"),
    }
  }
}

/// Input files handed to the map compiler.
///
/// In split mode these are glob patterns over the tile directories; otherwise
/// the plain data and contour files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapInputs {
  pub main: String,
  pub contours: String,
}

/// Mutable state of one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub area: AreaDescriptor,
  pub paths: BuildPaths,
  pub flags: BuildFlags,
  pub code_page: CodePage,
  /// Product version, e.g. `206` for 2.06.
  pub version: u32,
  /// Appended to the area id in every output name, e.g. `_VasaM`.
  pub suffix: String,
  /// Fresh source data was fetched this run; every later cache is stale.
  pub downloaded: bool,
  /// Current working source data (rewritten by the crop stage).
  pub map_data: PathBuf,
  /// Set by the split stage.
  pub map_inputs: Option<MapInputs>,
}

impl BuildContext {
  pub fn new(
    area: AreaDescriptor,
    paths: BuildPaths,
    flags: BuildFlags,
    code_page: CodePage,
    version: u32,
    suffix: String,
  ) -> Self {
    let map_data = paths.pbf.join(format!("{}.osm.pbf", area.id));
    Self {
      area,
      paths,
      flags,
      code_page,
      version,
      suffix,
      downloaded: false,
      map_data,
      map_inputs: None,
    }
  }

  /// Downloaded source data for the area.
  pub fn source_path(&self) -> PathBuf {
    self.paths.pbf.join(format!("{}.osm.pbf", self.area.id))
  }

  /// Canonical contour artifact.
  pub fn contour_path(&self) -> PathBuf {
    self.paths.pbf.join(format!("{}-SRTM.osm.pbf", self.area.id))
  }

  /// Output prefix handed to the contour generator, which appends its own
  /// coordinate suffix.
  pub fn contour_prefix(&self) -> PathBuf {
    self.paths.pbf.join(format!("{}-SRTM", self.area.id))
  }

  /// Glob matching every file the contour generator may produce.
  pub fn contour_pattern(&self) -> String {
    let prefix = self.contour_prefix().display().to_string();
    format!("{}*.osm.pbf", glob::Pattern::escape(&prefix))
  }

  pub fn split_dir(&self) -> PathBuf {
    self.paths.pbf.join(format!("{}-SPLITTED", self.area.id))
  }

  pub fn split_contour_dir(&self) -> PathBuf {
    self.paths.pbf.join(format!("{}-SPLITTED-SRTM", self.area.id))
  }

  pub fn cropped_path(&self) -> PathBuf {
    self.paths.temp.join(format!("{}.osm.pbf", self.area.id))
  }

  pub fn license_path(&self) -> PathBuf {
    self.paths.temp.join("license.txt")
  }

  /// Area id plus suffix, e.g. `CZ01_VasaM`.
  pub fn map_name(&self) -> String {
    format!("{}{}", self.area.id, self.suffix)
  }

  /// Directory the map compiler writes into.
  pub fn output_dir(&self) -> PathBuf {
    self.paths.img.join(self.map_name())
  }

  pub fn img_path(&self) -> PathBuf {
    self.paths.img.join(format!("{}.img", self.map_name()))
  }

  pub fn zip_path(&self) -> PathBuf {
    self.paths.img.join(format!("{}.zip", self.map_name()))
  }

  pub fn info_path(&self) -> PathBuf {
    self.paths.img.join(format!("{}.info", self.map_name()))
  }

  /// Cropping was requested globally or by the area itself.
  pub fn crop_requested(&self) -> bool {
    self.flags.crop || self.area.crop
  }

  /// Map inputs recorded by the split stage, or the unsplit files.
  pub fn map_inputs(&self) -> MapInputs {
    self.map_inputs.clone().unwrap_or_else(|| MapInputs {
      main: self.map_data.display().to_string(),
      contours: self.contour_path().display().to_string(),
    })
  }
}
