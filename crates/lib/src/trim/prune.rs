//! Removal of empty directories and version-control leftovers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use super::TrimError;
use crate::consts::PRUNED_DIRS;

#[derive(Debug, Default, Serialize)]
pub struct PruneReport {
  /// `CVS` and `.git` directories removed with their contents.
  pub vcs_dirs: Vec<PathBuf>,
  /// Directories removed because they were, or became, empty.
  pub empty_dirs: Vec<PathBuf>,
}

/// Prune `tree` bottom-up.
///
/// `CVS` and `.git` directories are removed first. Then every directory that
/// is empty is removed, children before parents, so a directory emptied by
/// pruning goes too. The root itself is removed if nothing is left in it.
pub fn prune_empty_dirs(tree: &Path) -> Result<PruneReport, TrimError> {
  let mut report = PruneReport::default();
  if !tree.is_dir() {
    return Ok(report);
  }

  let vcs_dirs: Vec<PathBuf> = WalkDir::new(tree)
    .into_iter()
    .filter_entry(|e| !is_pruned_name(e.path()) || e.depth() == 0)
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_dir())
    .flat_map(|e| {
      PRUNED_DIRS
        .iter()
        .map(|name| e.path().join(name))
        .filter(|p| p.is_dir())
        .collect::<Vec<_>>()
    })
    .collect();

  for path in vcs_dirs {
    debug!(path = %path.display(), "pruning dir");
    fs::remove_dir_all(&path).map_err(|source| TrimError::Delete {
      path: path.clone(),
      source,
    })?;
    report.vcs_dirs.push(path);
  }

  let dirs: Vec<PathBuf> = WalkDir::new(tree)
    .contents_first(true)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_dir())
    .map(|e| e.into_path())
    .collect();

  for dir in dirs {
    if !is_empty_dir(&dir)? {
      continue;
    }
    debug!(path = %dir.display(), "pruning empty dir");
    fs::remove_dir(&dir).map_err(|source| TrimError::Delete {
      path: dir.clone(),
      source,
    })?;
    report.empty_dirs.push(dir);
  }

  Ok(report)
}

fn is_pruned_name(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|n| n.to_str())
    .is_some_and(|n| PRUNED_DIRS.contains(&n))
}

fn is_empty_dir(dir: &Path) -> Result<bool, TrimError> {
  let mut entries = fs::read_dir(dir).map_err(|source| TrimError::ReadDir {
    path: dir.to_path_buf(),
    source,
  })?;
  Ok(entries.next().is_none())
}
