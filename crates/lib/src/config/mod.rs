//! Build configuration.
//!
//! Operator flags arrive as [`BuildOptions`], plain data with no validation.
//! [`BuildConfiguration::derive`] validates them and computes every path the
//! run touches. Deriving has no side effects: nothing is created or fetched
//! until the configuration is handed to the orchestrator.

pub mod release;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::platform::Os;
use crate::platform::paths::{default_build_dir, default_log_dir, default_prefix};

pub use release::Release;

/// Errors raised while validating operator options.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid package name: {0} (options: lrose-core, lrose-radx, lrose-cidd, samurai)")]
  InvalidPackage(String),

  #[error("invalid release date: {0} (expected YYYYMMDD)")]
  InvalidReleaseDate(String),

  #[error("cannot resolve path '{path}': {source}")]
  InvalidPath {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// The packages that can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Package {
  #[default]
  LroseCore,
  LroseRadx,
  LroseCidd,
  Samurai,
}

impl Package {
  pub const ALL: [Package; 4] = [Self::LroseCore, Self::LroseRadx, Self::LroseCidd, Self::Samurai];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::LroseCore => "lrose-core",
      Self::LroseRadx => "lrose-radx",
      Self::LroseCidd => "lrose-cidd",
      Self::Samurai => "samurai",
    }
  }
}

impl fmt::Display for Package {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Package {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|p| p.as_str() == s)
      .ok_or_else(|| ConfigError::InvalidPackage(s.to_string()))
  }
}

/// Raw operator options.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub package: String,
  pub prefix: PathBuf,
  pub build_dir: PathBuf,
  pub log_dir: PathBuf,
  pub release_date: String,
  pub tag: String,
  pub clean: bool,
  pub debug: bool,
  pub verbose: bool,
  pub static_link: bool,
  pub install_all_runtime_libs: bool,
  pub install_lrose_runtime_libs: bool,
  pub no_scripts: bool,
  pub build_netcdf: bool,
  pub build_fractl: bool,
  pub build_vortrac: bool,
  pub build_samurai: bool,
  pub build_geolib: bool,
  pub use_cmake3: bool,
  pub no_core_apps: bool,
  pub with_jasper: bool,
  pub verbose_make: bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      package: Package::default().to_string(),
      prefix: default_prefix(),
      build_dir: default_build_dir(),
      log_dir: default_log_dir(),
      release_date: release::LATEST.to_string(),
      tag: release::DEFAULT_TAG.to_string(),
      clean: false,
      debug: true,
      verbose: false,
      static_link: false,
      install_all_runtime_libs: false,
      install_lrose_runtime_libs: false,
      no_scripts: false,
      build_netcdf: false,
      build_fractl: false,
      build_vortrac: false,
      build_samurai: false,
      build_geolib: false,
      use_cmake3: false,
      no_core_apps: false,
      with_jasper: false,
      verbose_make: false,
    }
  }
}

/// Normalized boolean switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildFlags {
  pub clean: bool,
  pub debug: bool,
  pub verbose: bool,
  pub static_link: bool,
  pub install_all_runtime_libs: bool,
  pub install_lrose_runtime_libs: bool,
  pub no_scripts: bool,
  pub build_netcdf: bool,
  pub build_fractl: bool,
  pub build_vortrac: bool,
  pub build_samurai: bool,
  pub build_geolib: bool,
  pub use_cmake3: bool,
  pub no_core_apps: bool,
  pub with_jasper: bool,
  pub verbose_make: bool,
}

/// Everything one run needs to know, computed once.
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfiguration {
  pub package: Package,
  pub release: Release,
  /// Build date as `YYYYMMDD`.
  pub date_str: String,
  pub os: Os,
  pub flags: BuildFlags,
  pub prefix: PathBuf,
  pub build_dir: PathBuf,
  pub log_dir: PathBuf,
  /// Directory name, relative to the bin dir, holding copied runtime libraries.
  pub runtime_lib_rel_dir: String,
}

impl BuildConfiguration {
  /// Validate `options` against today's date and the current host.
  pub fn from_options(options: &BuildOptions) -> Result<Self, ConfigError> {
    Self::derive(options, Utc::now().date_naive(), Os::current())
  }

  /// Validate `options` and compute the configuration.
  ///
  /// Fails on an unknown package or a malformed release date. CIDD always
  /// links statically, and `verbose` implies `debug`.
  pub fn derive(options: &BuildOptions, today: NaiveDate, os: Os) -> Result<Self, ConfigError> {
    let package: Package = options.package.parse()?;
    let release = Release::resolve(package, &options.tag, &options.release_date, today)?;

    let flags = BuildFlags {
      clean: options.clean,
      debug: options.debug || options.verbose,
      verbose: options.verbose,
      static_link: options.static_link || package == Package::LroseCidd,
      install_all_runtime_libs: options.install_all_runtime_libs,
      install_lrose_runtime_libs: options.install_lrose_runtime_libs,
      no_scripts: options.no_scripts,
      build_netcdf: options.build_netcdf,
      build_fractl: options.build_fractl,
      build_vortrac: options.build_vortrac,
      build_samurai: options.build_samurai,
      build_geolib: options.build_geolib,
      use_cmake3: options.use_cmake3,
      no_core_apps: options.no_core_apps,
      with_jasper: options.with_jasper,
      verbose_make: options.verbose_make,
    };

    Ok(Self {
      package,
      release,
      date_str: today.format("%Y%m%d").to_string(),
      os,
      flags,
      prefix: absolute(&options.prefix)?,
      build_dir: absolute(&options.build_dir)?,
      log_dir: absolute(&options.log_dir)?,
      runtime_lib_rel_dir: format!("{}_runtime_libs", package),
    })
  }

  pub fn scratch_dir(&self) -> PathBuf {
    self.build_dir.join("scratch")
  }

  pub fn scratch_bin_dir(&self) -> PathBuf {
    self.scratch_dir().join("bin")
  }

  pub fn scratch_lib_dir(&self) -> PathBuf {
    self.scratch_dir().join("lib")
  }

  pub fn scratch_include_dir(&self) -> PathBuf {
    self.scratch_dir().join("include")
  }

  /// Checkout of the core repository.
  pub fn core_dir(&self) -> PathBuf {
    self.build_dir.join("lrose-core")
  }

  pub fn codebase_dir(&self) -> PathBuf {
    self.core_dir().join("codebase")
  }

  pub fn displays_dir(&self) -> PathBuf {
    self.build_dir.join("lrose-displays")
  }

  pub fn netcdf_dir(&self) -> PathBuf {
    self.build_dir.join("lrose-netcdf")
  }

  pub fn prefix_bin_dir(&self) -> PathBuf {
    self.prefix.join("bin")
  }

  pub fn prefix_lib_dir(&self) -> PathBuf {
    self.prefix.join("lib")
  }

  pub fn prefix_include_dir(&self) -> PathBuf {
    self.prefix.join("include")
  }

  pub fn prefix_share_dir(&self) -> PathBuf {
    self.prefix.join("share")
  }

  pub fn prefix_scripts_dir(&self) -> PathBuf {
    self.prefix.join("scripts")
  }

  /// Flag forwarded to helper scripts: `--verbose`, `--debug`, or nothing.
  pub fn debug_arg(&self) -> Option<&'static str> {
    if self.flags.verbose {
      Some("--verbose")
    } else if self.flags.debug {
      Some("--debug")
    } else {
      None
    }
  }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
  std::path::absolute(path).map_err(|source| ConfigError::InvalidPath {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
  }

  fn options() -> BuildOptions {
    BuildOptions {
      prefix: PathBuf::from("/opt/lrose"),
      build_dir: PathBuf::from("/tmp/lrose-build"),
      log_dir: PathBuf::from("/tmp/lrose-build/logs"),
      debug: false,
      ..BuildOptions::default()
    }
  }

  #[test]
  fn package_names_round_trip() {
    for package in Package::ALL {
      assert_eq!(package.as_str().parse::<Package>().unwrap(), package);
    }
  }

  #[test]
  fn unknown_package_is_a_config_error() {
    let err = "lrose-blaze".parse::<Package>().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPackage(ref name) if name == "lrose-blaze"));
    assert!(err.to_string().contains("lrose-core, lrose-radx, lrose-cidd, samurai"));
  }

  #[test]
  fn derive_rejects_invalid_package() {
    let opts = BuildOptions {
      package: "LROSE-CORE".to_string(),
      ..options()
    };
    assert!(matches!(
      BuildConfiguration::derive(&opts, today(), Os::Linux),
      Err(ConfigError::InvalidPackage(_))
    ));
  }

  #[test]
  fn derive_computes_paths() {
    let cfg = BuildConfiguration::derive(&options(), today(), Os::Linux).unwrap();

    assert_eq!(cfg.scratch_dir(), PathBuf::from("/tmp/lrose-build/scratch"));
    assert_eq!(cfg.scratch_lib_dir(), PathBuf::from("/tmp/lrose-build/scratch/lib"));
    assert_eq!(cfg.codebase_dir(), PathBuf::from("/tmp/lrose-build/lrose-core/codebase"));
    assert_eq!(cfg.displays_dir(), PathBuf::from("/tmp/lrose-build/lrose-displays"));
    assert_eq!(cfg.prefix_share_dir(), PathBuf::from("/opt/lrose/share"));
    assert_eq!(cfg.prefix_scripts_dir(), PathBuf::from("/opt/lrose/scripts"));
    assert_eq!(cfg.runtime_lib_rel_dir, "lrose-core_runtime_libs");
    assert_eq!(cfg.date_str, "20240309");
  }

  #[test]
  fn relative_paths_are_made_absolute() {
    let opts = BuildOptions {
      prefix: PathBuf::from("install"),
      ..options()
    };
    let cfg = BuildConfiguration::derive(&opts, today(), Os::Linux).unwrap();
    assert!(cfg.prefix.is_absolute());
    assert!(cfg.prefix.ends_with("install"));
  }

  #[test]
  fn cidd_forces_static_linking() {
    let opts = BuildOptions {
      package: "lrose-cidd".to_string(),
      ..options()
    };
    let cfg = BuildConfiguration::derive(&opts, today(), Os::Linux).unwrap();
    assert!(cfg.flags.static_link);

    let cfg = BuildConfiguration::derive(&options(), today(), Os::Linux).unwrap();
    assert!(!cfg.flags.static_link);
  }

  #[test]
  fn verbose_implies_debug() {
    let opts = BuildOptions {
      verbose: true,
      ..options()
    };
    let cfg = BuildConfiguration::derive(&opts, today(), Os::Linux).unwrap();
    assert!(cfg.flags.debug);
    assert_eq!(cfg.debug_arg(), Some("--verbose"));

    let opts = BuildOptions {
      debug: true,
      ..options()
    };
    let cfg = BuildConfiguration::derive(&opts, today(), Os::Linux).unwrap();
    assert_eq!(cfg.debug_arg(), Some("--debug"));

    let cfg = BuildConfiguration::derive(&options(), today(), Os::Linux).unwrap();
    assert_eq!(cfg.debug_arg(), None);
  }
}
