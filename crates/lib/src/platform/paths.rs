//! Per-user locations searched for `gmapmaker.toml`.

use std::path::PathBuf;

use crate::consts::APP_NAME;

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// The user's home directory.
pub fn home_dir() -> Option<PathBuf> {
  if cfg!(windows) { env_path("USERPROFILE") } else { env_path("HOME") }
}

/// Per-user settings directory: `%APPDATA%\gmapmaker` on Windows,
/// `$XDG_CONFIG_HOME/gmapmaker` (or `~/.config/gmapmaker`) elsewhere.
pub fn config_dir() -> Option<PathBuf> {
  let base = if cfg!(windows) {
    env_path("APPDATA")?
  } else {
    env_path("XDG_CONFIG_HOME").or_else(|| home_dir().map(|home| home.join(".config")))?
  };
  Some(base.join(APP_NAME))
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn xdg_config_home_wins_over_home() {
    temp_env::with_vars([("XDG_CONFIG_HOME", Some("/srv/cfg")), ("HOME", Some("/home/mapper"))], || {
      assert_eq!(config_dir(), Some(PathBuf::from("/srv/cfg/gmapmaker")));
    });
  }

  #[test]
  #[serial]
  fn empty_xdg_falls_back_to_home() {
    temp_env::with_vars([("XDG_CONFIG_HOME", Some("")), ("HOME", Some("/home/mapper"))], || {
      assert_eq!(config_dir(), Some(PathBuf::from("/home/mapper/.config/gmapmaker")));
    });
  }

  #[test]
  #[serial]
  fn nothing_set_means_no_settings_dir() {
    temp_env::with_vars([("XDG_CONFIG_HOME", None::<&str>), ("HOME", None::<&str>)], || {
      assert_eq!(config_dir(), None);
    });
  }
}
