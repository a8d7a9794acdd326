//! Registry of buildable areas.
//!
//! ```toml
//! [[area]]
//! id = "CZ01"
//! name = "Česko"
//! number = 136
//! url = "https://download.geofabrik.de/europe/czech-republic-latest.osm.pbf"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConfigError, read};
use crate::context::AreaDescriptor;

/// Largest product id that still fits the 8-digit map names.
pub const MAX_AREA_NUMBER: u32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaEntry {
  pub id: String,
  pub name: String,
  pub number: u32,
  /// Polygon file, relative to the polygons directory. Defaults to `<id>.poly`.
  #[serde(default)]
  pub polygon: Option<PathBuf>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub crop: bool,
  /// Overlay files, relative to the registry file.
  #[serde(default)]
  pub pois: Vec<PathBuf>,
  /// Fixed data timestamp, for reproducible rebuilds.
  #[serde(default)]
  pub timestamp: Option<DateTime<Utc>>,
}

impl AreaEntry {
  /// Polygon path with the polygons directory applied.
  pub fn polygon_path(&self, polygons: &Path) -> PathBuf {
    match &self.polygon {
      Some(p) => polygons.join(p),
      None => polygons.join(format!("{}.poly", self.id)),
    }
  }

  /// The run-scoped descriptor for this area.
  ///
  /// `built_at` stands in for the data timestamp when the entry has none.
  pub fn descriptor(&self, polygons: &Path, built_at: DateTime<Utc>, number: Option<u32>) -> AreaDescriptor {
    AreaDescriptor {
      id: self.id.clone(),
      name: self.name.clone(),
      number: number.unwrap_or(self.number),
      polygon: self.polygon_path(polygons),
      timestamp: self.timestamp.unwrap_or(built_at),
      pois: self.pois.clone(),
      crop: self.crop,
      url: self.url.clone(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
  #[serde(default)]
  area: Vec<AreaEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaRegistry {
  areas: Vec<AreaEntry>,
}

impl AreaRegistry {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_toml(&read(path)?, path)
  }

  pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
    let mut file: RegistryFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
      path: origin.to_path_buf(),
      source,
    })?;
    let base = origin.parent().unwrap_or(Path::new(""));

    let mut seen = HashSet::new();
    for area in &file.area {
      if !seen.insert(area.id.to_ascii_uppercase()) {
        return Err(ConfigError::DuplicateArea(area.id.clone()));
      }
      check_number(&area.id, area.number)?;
    }
    for area in &mut file.area {
      for poi in &mut area.pois {
        *poi = base.join(&*poi);
      }
    }

    Ok(Self { areas: file.area })
  }

  pub fn get(&self, id: &str) -> Result<&AreaEntry, ConfigError> {
    self
      .areas
      .iter()
      .find(|a| a.id.eq_ignore_ascii_case(id))
      .ok_or_else(|| ConfigError::UnknownArea(id.to_string()))
  }

  pub fn iter(&self) -> impl Iterator<Item = &AreaEntry> {
    self.areas.iter()
  }

  pub fn len(&self) -> usize {
    self.areas.len()
  }

  pub fn is_empty(&self) -> bool {
    self.areas.is_empty()
  }
}

/// Product ids are written as four zero-padded digits.
pub fn check_number(id: &str, number: u32) -> Result<(), ConfigError> {
  if number > MAX_AREA_NUMBER {
    return Err(ConfigError::InvalidAreaNumber {
      id: id.to_string(),
      number,
    });
  }
  Ok(())
}
