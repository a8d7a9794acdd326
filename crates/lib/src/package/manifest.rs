//! The `.info` manifest published next to each map.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::context::{BuildContext, DATETIME_FORMAT};
use crate::util::hash::ContentHash;

/// Build metadata consumed by the download site. Every value is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
  #[serde(rename = "ID")]
  pub id: String,
  pub version: String,
  /// Data timestamp, e.g. `2021-08-11 10:00:00+00:00`.
  pub datetime: String,
  /// The same instant as Unix seconds.
  pub timestamp: String,
  #[serde(rename = "hashImg")]
  pub hash_img: String,
  #[serde(rename = "hashZip")]
  pub hash_zip: String,
  #[serde(rename = "codePage")]
  pub code_page: String,
}

impl BuildManifest {
  pub fn new(ctx: &BuildContext, hash_img: &ContentHash, hash_zip: &ContentHash) -> Self {
    Self {
      id: ctx.area.id.clone(),
      version: ctx.version.to_string(),
      datetime: ctx.area.datetime_text(),
      timestamp: ctx.area.timestamp.timestamp().to_string(),
      hash_img: hash_img.to_string(),
      hash_zip: hash_zip.to_string(),
      code_page: ctx.code_page.manifest_value(),
    }
  }

  /// Parse the `datetime` field back into an instant.
  pub fn parsed_datetime(&self) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(&self.datetime, DATETIME_FORMAT).ok()
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }

  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }
}
