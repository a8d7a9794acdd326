//! Installer script and license templates.
//!
//! The scripts register the map family with Garmin BaseCamp/MapInstall on
//! Windows. Placeholders are `%NAME%` (area display name), `%ID%` (zero-padded
//! decimal product id) and `%ID_HEX%` (family id as little-endian hex, the
//! byte order the registry `ID` value expects).

use crate::context::AreaDescriptor;
use crate::error::BuildError;

pub const INSTALL_TEMPLATE: &str = r#"@echo off
set KEY=HKLM\SOFTWARE\Wow6432Node\Garmin\MapSource\Families\%NAME%
set DIR=%~dp0

reg ADD "%KEY%" /v ID /t REG_BINARY /d %ID_HEX% /f
reg ADD "%KEY%\1" /v Loc /t REG_SZ /d "%DIR%" /f
reg ADD "%KEY%\1" /v Bmap /t REG_SZ /d "%DIR%%ID%0000.img" /f
reg ADD "%KEY%\1" /v Tdb /t REG_SZ /d "%DIR%%ID%0000.tdb" /f

echo %NAME% installed.
pause
"#;

pub const UNINSTALL_TEMPLATE: &str = r#"@echo off
reg DELETE "HKLM\SOFTWARE\Wow6432Node\Garmin\MapSource\Families\%NAME%" /f

echo %NAME% uninstalled.
pause
"#;

pub const LICENSE_TEMPLATE: &str = "\
Map data (c) OpenStreetMap contributors, available under the Open Database License (ODbL).
Elevation data: viewfinderpanoramas.org.
This map is provided as is, without any warranty. Do not rely on it for navigation where safety matters.
Data timestamp:";

/// Which installer script to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
  Install,
  Uninstall,
}

impl ScriptKind {
  pub const ALL: [ScriptKind; 2] = [ScriptKind::Install, ScriptKind::Uninstall];

  pub fn file_name(&self) -> &'static str {
    match self {
      Self::Install => "install.bat",
      Self::Uninstall => "uninstall.bat",
    }
  }

  pub fn template(&self) -> &'static str {
    match self {
      Self::Install => INSTALL_TEMPLATE,
      Self::Uninstall => UNINSTALL_TEMPLATE,
    }
  }
}

/// Family id as hex with its two bytes swapped: 136 (`0x0088`) becomes `8800`.
///
/// The registry value holds two bytes, so ids above 65535 are rejected.
pub fn family_hex(number: u32) -> Result<String, BuildError> {
  let id = u16::try_from(number)
    .map_err(|_| BuildError::precondition(format!("family id {} does not fit the registry ID value", number)))?;
  Ok(hex::encode(id.to_le_bytes()))
}

/// Substitute the area into a script template.
pub fn render_script(kind: ScriptKind, area: &AreaDescriptor) -> Result<String, BuildError> {
  Ok(
    kind
      .template()
      .replace("%NAME%", &area.name)
      .replace("%ID_HEX%", &family_hex(area.number)?)
      .replace("%ID%", &area.padded_number()),
  )
}

/// License text with the data timestamp appended on its own line.
pub fn render_license(template: &str, area: &AreaDescriptor) -> String {
  format!("{}\n{}", template, area.datetime_text())
}
