//! Crate-wide constants.

/// Application name used for config and data directories.
pub const APP_NAME: &str = "gmapmaker";

/// Author tag appended to every produced map name.
pub const AUTHOR_TAG: &str = "VasaM";

/// Default config file name, looked up in the working directory first.
pub const CONFIG_FILENAME: &str = "gmapmaker.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GMAPMAKER_CONFIG";

/// Default area registry file name.
pub const AREAS_FILENAME: &str = "areas.toml";

/// Suffix for files and directories still being written.
pub const PARTIAL_SUFFIX: &str = "partial";
