use std::fmt;

use serde::Serialize;

/// Host operating systems the build distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  MacOs,
  Other,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Self {
    match std::env::consts::OS {
      "linux" => Self::Linux,
      "macos" => Self::MacOs,
      _ => Self::Other,
    }
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Other => "other",
    }
  }

  pub fn is_macos(&self) -> bool {
    matches!(self, Self::MacOs)
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn macos_uses_darwin_identifier() {
    assert_eq!(Os::MacOs.as_str(), "darwin");
    assert!(Os::MacOs.is_macos());
    assert!(!Os::Linux.is_macos());
  }

  #[test]
  #[cfg(target_os = "linux")]
  fn current_detects_linux() {
    assert_eq!(Os::current(), Os::Linux);
  }
}
