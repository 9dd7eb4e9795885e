//! Preparing and cleaning the build root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BuildConfiguration;

#[derive(Debug, Error)]
pub enum SetupError {
  #[error("not overwriting existing build dir {0}")]
  UserAbort(PathBuf),

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create {path}: {source}")]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to list {path}: {source}")]
  List {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Asks whether an existing build dir may be wiped.
pub trait Confirm {
  /// `contents` are the entry names found in `dir`, sorted.
  fn confirm_overwrite(&mut self, dir: &Path, contents: &[String]) -> bool;
}

impl<F> Confirm for F
where
  F: FnMut(&Path, &[String]) -> bool,
{
  fn confirm_overwrite(&mut self, dir: &Path, contents: &[String]) -> bool {
    self(dir, contents)
  }
}

/// Accepts without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Force;

impl Confirm for Force {
  fn confirm_overwrite(&mut self, _dir: &Path, _contents: &[String]) -> bool {
    true
  }
}

/// Directories created by [`prepare_build_dir`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupReport {
  /// Set when an existing build dir was wiped first.
  pub removed_existing: bool,
  pub created: Vec<PathBuf>,
}

/// Start from an empty build dir with scratch and log dirs in place.
///
/// An existing build dir is only removed after `confirm` agrees. Dirs that
/// already exist afterwards are left alone.
pub fn prepare_build_dir(cfg: &BuildConfiguration, confirm: &mut dyn Confirm) -> Result<SetupReport, SetupError> {
  let mut report = SetupReport::default();
  let build_dir = &cfg.build_dir;

  if build_dir.exists() {
    let contents = list_dir(build_dir)?;
    if !confirm.confirm_overwrite(build_dir, &contents) {
      return Err(SetupError::UserAbort(build_dir.clone()));
    }
    info!(dir = %build_dir.display(), "removing existing build dir");
    fs::remove_dir_all(build_dir).map_err(|source| SetupError::Remove {
      path: build_dir.clone(),
      source,
    })?;
    report.removed_existing = true;
  }

  let dirs = [
    cfg.build_dir.clone(),
    cfg.log_dir.clone(),
    cfg.scratch_dir(),
    cfg.scratch_bin_dir(),
    cfg.scratch_lib_dir(),
    cfg.scratch_include_dir(),
  ];
  for dir in dirs {
    if dir.is_dir() {
      debug!(dir = %dir.display(), "dir exists");
      continue;
    }
    fs::create_dir_all(&dir).map_err(|source| SetupError::Create {
      path: dir.clone(),
      source,
    })?;
    report.created.push(dir);
  }
  Ok(report)
}

/// Empty the build dir after a successful run, keeping the log dir if it
/// lives inside. When the log dir is the build dir itself, only the stage
/// logs are kept. Returns the paths removed.
pub fn clean_build_dir(cfg: &BuildConfiguration) -> Result<Vec<PathBuf>, SetupError> {
  let logs_at_root = cfg.log_dir == cfg.build_dir;
  let mut removed = Vec::new();
  for name in list_dir(&cfg.build_dir)? {
    let path = cfg.build_dir.join(&name);
    if !logs_at_root && cfg.log_dir.starts_with(&path) {
      debug!(path = %path.display(), "keeping log dir");
      continue;
    }
    if logs_at_root && path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
      debug!(path = %path.display(), "keeping stage log");
      continue;
    }
    let result = if path.is_dir() {
      fs::remove_dir_all(&path)
    } else {
      fs::remove_file(&path)
    };
    result.map_err(|source| SetupError::Remove {
      path: path.clone(),
      source,
    })?;
    removed.push(path);
  }
  info!(dir = %cfg.build_dir.display(), removed = removed.len(), "cleaned build dir");
  Ok(removed)
}

fn list_dir(dir: &Path) -> Result<Vec<String>, SetupError> {
  let entries = fs::read_dir(dir).map_err(|source| SetupError::List {
    path: dir.to_path_buf(),
    source,
  })?;
  let mut names = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| SetupError::List {
      path: dir.to_path_buf(),
      source,
    })?;
    names.push(entry.file_name().to_string_lossy().into_owned());
  }
  names.sort();
  Ok(names)
}
