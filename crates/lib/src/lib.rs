//! gmapmaker-lib: build pipeline for Garmin maps from OpenStreetMap data
//!
//! A build drives a fixed sequence of external tools over one area:
//! - `download`: fetch fresh source data when the local copy is stale
//! - `contours`: generate elevation contours for the area polygon
//! - `crop`: cut the source data down to the polygon (optional)
//! - `split`: tile data and contours for the map compiler
//! - `map build`: compile the map image and its installer scripts
//!
//! Each stage skips itself when its output is still valid on disk. After the
//! last stage the [`package::Packager`] archives the result and writes the
//! manifest with content digests.

pub mod artifact;
pub mod build_lock;
pub mod config;
pub mod consts;
pub mod context;
pub mod error;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod stage;
pub mod templates;
pub mod util;

pub use context::{AreaDescriptor, BuildContext, BuildFlags, BuildPaths, CodePage};
pub use error::BuildError;
pub use pipeline::{PipelineController, PipelineReport, StageConfigs};
