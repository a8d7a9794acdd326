//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Stand-in for phyghtmap: writes one contour file for the `-o` prefix.
const FAKE_PHYGHTMAP: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -o) prefix="$2"; shift ;;
  esac
  shift
done
echo "computing contours"
echo "void areas filled" >&2
printf 'srtm' > "${prefix}_lon12.09_18.86lat48.55_51.06_view3.osm.pbf"
"#;

/// Stand-in for java running either the splitter or mkgmap.
const FAKE_JAVA: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    *splitter.jar) tool=splitter ;;
    *mkgmap.jar) tool=mkgmap ;;
    --output-dir=*) out="${arg#--output-dir=}" ;;
  esac
done
if [ -n "$FAKE_JAVA_FAIL" ] && [ "$tool" = "$FAKE_JAVA_FAIL" ]; then
  echo "java.lang.OutOfMemoryError: Java heap space" >&2
  exit 3
fi
mkdir -p "$out"
if [ "$tool" = splitter ]; then
  printf 'tile' > "$out/63240001.osm.pbf"
else
  printf 'garmin image' > "$out/gmapsupp.img"
  printf 'overview' > "$out/01360000.tdb"
fi
echo "$tool done"
"#;

const AREAS: &str = r#"
[[area]]
id = "CZ01"
name = "Česko"
number = 136
timestamp = "2021-08-11T10:00:00Z"
"#;

/// Isolated build environment.
///
/// Each test gets its own directory with settings, an area registry, local
/// map data and executable tool stand-ins.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };

    let java = env.write_script("bin/java", FAKE_JAVA);
    let phyghtmap = env.write_script("bin/phyghtmap", FAKE_PHYGHTMAP);
    env.write_file(
      "gmapmaker.toml",
      &format!(
        "version = 206\n\n[tools]\njava = \"{}\"\ncontour = \"{}\"\n",
        java.display(),
        phyghtmap.display()
      ),
    );
    env.write_file("areas.toml", AREAS);
    env.write_file("pbf/CZ01.osm.pbf", "czech republic");
    env
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  fn write_script(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.write_file(relative_path, content);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  pub fn img(&self, name: &str) -> PathBuf {
    self.root().join("img").join(name)
  }

  /// `gmapmaker build` for CZ01 from local data, run inside the environment.
  pub fn build_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("gmapmaker");
    cmd
      .current_dir(self.temp.path())
      .env_remove("GMAPMAKER_CONFIG")
      .env_remove("RUST_LOG")
      .env_remove("FAKE_JAVA_FAIL");
    cmd.args(["build", "--area", "CZ01", "--download", "skip"]);
    cmd
  }
}

pub fn read_json(path: &Path) -> serde_json::Value {
  serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
