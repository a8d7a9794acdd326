//! Test utilities for gmapmaker-lib.
//!
//! Shell helpers for process tests, a recording line sink, and a fake tool
//! runner that stands in for the external map tools.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::context::{AreaDescriptor, BuildContext, BuildFlags, BuildPaths, CodePage};
use crate::error::BuildError;
use crate::process::{Channel, ExecutionResult, LineSink, ToolInvocation, ToolRunner};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Sink that remembers every line it was given.
#[derive(Default)]
pub struct RecordingSink {
  lines: Mutex<Vec<(Channel, String)>>,
  started: Mutex<usize>,
}

impl RecordingSink {
  pub fn lines(&self) -> Vec<(Channel, String)> {
    self.lines.lock().unwrap().clone()
  }

  pub fn started(&self) -> usize {
    *self.started.lock().unwrap()
  }
}

impl LineSink for RecordingSink {
  fn started(&self, _invocation: &ToolInvocation) {
    *self.started.lock().unwrap() += 1;
  }

  fn line(&self, channel: Channel, line: &str) {
    self.lines.lock().unwrap().push((channel, line.to_string()));
  }
}

type Effect = Box<dyn Fn(&ToolInvocation) -> Result<ExecutionResult, BuildError> + Send + Sync>;

/// Tool runner that records invocations and runs a closure instead of a process.
///
/// The closure gets to create whatever files the real tool would have written.
pub struct FakeTools {
  calls: Mutex<Vec<ToolInvocation>>,
  effect: Effect,
}

impl FakeTools {
  /// Every invocation succeeds without touching the filesystem.
  pub fn succeeding() -> Self {
    Self::with(|_| Ok(ExecutionResult::default()))
  }

  pub fn with<F>(effect: F) -> Self
  where
    F: Fn(&ToolInvocation) -> Result<ExecutionResult, BuildError> + Send + Sync + 'static,
  {
    Self {
      calls: Mutex::new(Vec::new()),
      effect: Box::new(effect),
    }
  }

  pub fn calls(&self) -> Vec<ToolInvocation> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl ToolRunner for FakeTools {
  async fn run(&self, invocation: &ToolInvocation) -> Result<ExecutionResult, BuildError> {
    self.calls.lock().unwrap().push(invocation.clone());
    (self.effect)(invocation)
  }
}

/// A fresh context rooted in `root`, with every working directory created.
pub fn test_context(root: &Path) -> BuildContext {
  let paths = BuildPaths {
    temp: root.join("temp"),
    pbf: root.join("pbf"),
    img: root.join("img"),
    hgt: root.join("hgt"),
    sea: root.join("sea"),
    bounds: root.join("bounds.zip"),
  };
  for dir in [&paths.temp, &paths.pbf, &paths.img] {
    std::fs::create_dir_all(dir).unwrap();
  }

  let area = AreaDescriptor {
    id: "CZ01".to_string(),
    name: "Česko".to_string(),
    number: 136,
    polygon: root.join("polygons").join("CZ01.poly"),
    timestamp: Utc.with_ymd_and_hms(2021, 8, 11, 10, 0, 0).unwrap(),
    pois: vec![],
    crop: false,
    url: None,
  };

  BuildContext::new(
    area,
    paths,
    BuildFlags {
      crop: false,
      split: true,
      quiet: true,
    },
    CodePage::Numeric(1250),
    206,
    "_VasaM".to_string(),
  )
}

/// Create `path` (and its parents) with some content.
pub fn touch(path: &Path) -> PathBuf {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, b"data").unwrap();
  path.to_path_buf()
}
