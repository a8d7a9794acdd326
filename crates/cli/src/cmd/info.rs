use std::path::Path;

use anyhow::{Context, Result};

use gmapmaker_lib::config::Settings;
use gmapmaker_lib::platform::Platform;

use crate::output::{print_json, print_stat};

pub fn cmd_info(config: Option<&Path>, json: bool) -> Result<()> {
  let (settings, source) = Settings::discover(config).context("Failed to load settings")?;
  let platform = Platform::current();

  if json {
    let value = serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "platform": platform.map(|p| p.triple()),
      "osmconvert": platform.map(|p| p.osmconvert_name()),
      "settings_file": source,
      "settings": settings,
    });
    return print_json(&value);
  }

  println!("System:");
  match platform {
    Some(p) => {
      print_stat("Platform", &p.triple());
      print_stat("Convert tool", &p.osmconvert_name());
    }
    None => println!("Could not detect platform."),
  }

  println!();
  println!("Settings:");
  match &source {
    Some(path) => print_stat("File", &path.display().to_string()),
    None => print_stat("File", "(defaults)"),
  }
  print_stat("Product version", &settings.version.to_string());
  print_stat("Areas", &settings.areas.display().to_string());
  print_stat("Map data", &settings.dirs.pbf.display().to_string());
  print_stat("Output", &settings.dirs.img.display().to_string());
  print_stat("Temp", &settings.dirs.temp.display().to_string());
  Ok(())
}
