pub mod arch;
pub mod os;
pub mod paths;

pub use arch::Arch;
pub use os::Os;
use std::fmt;

/// Platform identifier combining architecture and OS (e.g., "x86_64-linux")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  /// Create a new platform identifier
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Returns the platform triple string (e.g., "x86_64-linux")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }

  /// Name of the bundled osmconvert binary for this platform.
  ///
  /// The binaries ship per pointer width: `osmconvert32`, `osmconvert64.exe`, ...
  pub fn osmconvert_name(&self) -> String {
    format!("osmconvert{}{}", self.arch.bits(), self.os.exe_suffix())
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn platform_triple_format() {
    let platform = Platform::new(Arch::Aarch64, Os::MacOs);
    assert_eq!(platform.triple(), "aarch64-darwin");

    let platform = Platform::new(Arch::X86_64, Os::Linux);
    assert_eq!(platform.triple(), "x86_64-linux");
  }

  #[test]
  fn osmconvert_name_per_platform() {
    assert_eq!(Platform::new(Arch::X86, Os::Windows).osmconvert_name(), "osmconvert32.exe");
    assert_eq!(Platform::new(Arch::X86_64, Os::Windows).osmconvert_name(), "osmconvert64.exe");
    assert_eq!(Platform::new(Arch::X86_64, Os::Linux).osmconvert_name(), "osmconvert64");
  }
}
