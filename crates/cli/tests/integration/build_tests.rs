//! Build command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, read_json};

#[test]
fn build_produces_map_archive_and_manifest() {
  let env = TestEnv::new();

  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("[RUN]"))
    .stdout(predicate::str::contains("splitter done"))
    .stdout(predicate::str::contains("Map CZ01_VasaM built"));

  assert_eq!(std::fs::read(env.img("CZ01_VasaM.img")).unwrap(), b"garmin image");
  assert!(env.img("CZ01_VasaM.zip").is_file());
  assert!(env.img("CZ01_VasaM").join("install.bat").is_file());
  assert!(env.root().join("pbf").join("CZ01-SRTM.osm.pbf").is_file());
  assert!(env.root().join("temp").join("license.txt").is_file());

  let manifest = read_json(&env.img("CZ01_VasaM.info"));
  assert_eq!(manifest["ID"], "CZ01");
  assert_eq!(manifest["version"], "206");
  assert_eq!(manifest["datetime"], "2021-08-11 10:00:00+00:00");
  assert_eq!(manifest["timestamp"], "1628676000");
  assert_eq!(manifest["codePage"], "1250");
  assert_eq!(manifest["hashImg"].as_str().unwrap().len(), 40);
  assert_eq!(manifest["hashZip"].as_str().unwrap().len(), 40);
}

#[test]
fn rebuild_reports_cached_stages() {
  let env = TestEnv::new();
  env.build_cmd().assert().success();

  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("contours (up to date)"))
    .stdout(predicate::str::contains("split (up to date)"))
    .stdout(predicate::str::contains("computing contours").not());
}

#[test]
fn quiet_build_prints_nothing() {
  let env = TestEnv::new();

  env
    .build_cmd()
    .arg("--quiet")
    .assert()
    .success()
    .stdout(predicate::str::is_empty());

  assert!(env.img("CZ01_VasaM.info").is_file());
}

#[test]
fn suffix_and_code_page_reach_the_output() {
  let env = TestEnv::new();

  env
    .build_cmd()
    .args(["--suffix", "test", "--code-page", "unicode"])
    .assert()
    .success();

  let manifest = read_json(&env.img("CZ01_test_VasaM.info"));
  assert_eq!(manifest["codePage"], "65001");
}

#[test]
fn tool_failure_exits_with_stderr() {
  let env = TestEnv::new();

  env
    .build_cmd()
    .env("FAKE_JAVA_FAIL", "mkgmap")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("returned 3 (0 expected)"))
    .stderr(predicate::str::contains("OutOfMemoryError"));

  assert!(!env.img("CZ01_VasaM.img").exists());
  assert!(!env.img("CZ01_VasaM.info").exists());
}

#[test]
fn logging_writes_tool_output_to_file() {
  let env = TestEnv::new();

  env.build_cmd().args(["--quiet", "--logging", "build"]).assert().success();

  let log = std::fs::read_to_string(env.root().join("build.log")).unwrap();
  assert!(log.contains("void areas filled"));
  assert!(log.contains("channel=stderr"));
  assert!(log.contains("mkgmap done"));
}
