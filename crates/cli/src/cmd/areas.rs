//! Lists the areas from the registry.

use std::path::Path;

use anyhow::{Context, Result};

use gmapmaker_lib::config::{AreaRegistry, Settings};

use crate::output::{print_info, print_json, print_stat};

pub fn cmd_areas(config: Option<&Path>, json: bool) -> Result<()> {
  let (settings, _) = Settings::discover(config).context("Failed to load settings")?;
  let registry = AreaRegistry::load(&settings.areas).context("Failed to load area registry")?;

  if json {
    let areas: Vec<_> = registry.iter().collect();
    return print_json(&areas);
  }

  if registry.is_empty() {
    print_info(&format!("No areas defined in {}", settings.areas.display()));
    return Ok(());
  }

  for area in registry.iter() {
    println!("{:<8} {:>4}  {}", area.id, area.number, area.name);
    if let Some(url) = &area.url {
      print_stat("source", url);
    }
  }
  Ok(())
}
