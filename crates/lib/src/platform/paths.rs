use std::path::PathBuf;

use crate::consts::APP_NAME;

/// Returns the user's home directory
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("/"))
}

/// Default install prefix, `$HOME/lrose-install`.
pub fn default_prefix() -> PathBuf {
  home_dir().join("lrose-install")
}

/// Default scratch build root.
pub fn default_build_dir() -> PathBuf {
  std::env::temp_dir().join(APP_NAME)
}

/// Default log directory, inside the default build root.
pub fn default_log_dir() -> PathBuf {
  default_build_dir().join("logs")
}
