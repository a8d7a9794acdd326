use std::fmt;

/// CPU architecture variants the pipeline knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86,
  X86_64,
  Arm,
  Aarch64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86" => Some(Self::X86),
      "x86_64" => Some(Self::X86_64),
      "arm" => Some(Self::Arm),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Arm => "arm",
      Self::Aarch64 => "aarch64",
    }
  }

  /// Pointer width in bits.
  pub fn bits(&self) -> u8 {
    match self {
      Self::X86 | Self::Arm => 32,
      Self::X86_64 | Self::Aarch64 => 64,
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bits_follow_pointer_width() {
    assert_eq!(Arch::X86.bits(), 32);
    assert_eq!(Arch::Arm.bits(), 32);
    assert_eq!(Arch::X86_64.bits(), 64);
    assert_eq!(Arch::Aarch64.bits(), 64);
  }
}
