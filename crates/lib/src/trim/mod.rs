//! Directive-driven source tree trimming.
//!
//! Every directory of the checked-out codebase carries a descriptor listing
//! the subdirectories it needs (`SUB_DIRS`). Trimming walks down from a
//! starting directory and deletes every child directory that is neither
//! listed nor protected, then descends into the ones that were listed.
//!
//! Deciding is kept apart from deleting: [`plan_children`] is a pure function
//! of a directory listing and the required set, [`trim_to_descriptors`]
//! applies its decisions to the filesystem.
//!
//! A descriptor that is missing or lacks the key is indistinguishable from
//! one that requires nothing, so every unprotected child of such a directory
//! is deleted.

pub mod prune;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{DESCRIPTOR_NAMES, PROTECTED_DIRS, SUB_DIRS_KEY, TRIMMED_SUBDIRS};
use crate::directive::value_list_for_key;

pub use prune::{PruneReport, prune_empty_dirs};

#[derive(Debug, Error)]
pub enum TrimError {
  #[error("failed to list directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to delete {path}: {source}")]
  Delete {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// What happens to one child directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimDecision {
  /// Conventional name, kept without looking inside.
  KeepProtected,
  /// Listed by the parent's descriptor; kept and trimmed in turn.
  KeepRequired,
  /// Not listed; the whole subtree goes.
  Delete,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
  pub name: String,
  pub is_dir: bool,
}

impl ChildEntry {
  pub fn dir(name: &str) -> Self {
    Self {
      name: name.to_string(),
      is_dir: true,
    }
  }

  pub fn file(name: &str) -> Self {
    Self {
      name: name.to_string(),
      is_dir: false,
    }
  }
}

pub fn is_protected(name: &str) -> bool {
  PROTECTED_DIRS.contains(&name)
}

/// Decide the fate of a single child directory.
pub fn decide(name: &str, required: &[String]) -> TrimDecision {
  if is_protected(name) {
    TrimDecision::KeepProtected
  } else if required.iter().any(|r| r == name) {
    TrimDecision::KeepRequired
  } else {
    TrimDecision::Delete
  }
}

/// Decide every child directory of one listing. Files are left out.
pub fn plan_children(children: &[ChildEntry], required: &[String]) -> Vec<(String, TrimDecision)> {
  children
    .iter()
    .filter(|child| child.is_dir)
    .map(|child| (child.name.clone(), decide(&child.name, required)))
    .collect()
}

/// Subdirectories required by the descriptor in `dir`.
///
/// Tries `makefile` first and falls back to `Makefile` when that yields
/// nothing.
pub fn required_subdirs(dir: &Path) -> Vec<String> {
  for name in DESCRIPTOR_NAMES {
    let values = value_list_for_key(&dir.join(name), SUB_DIRS_KEY);
    if !values.is_empty() {
      return values;
    }
    debug!(dir = %dir.display(), descriptor = name, "no required subdirs declared");
  }
  Vec::new()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrimOptions {
  /// Record deletions without performing them.
  pub dry_run: bool,
}

/// Outcome of trimming one subtree.
#[derive(Debug, Default, Serialize)]
pub struct TrimReport {
  pub dirs_considered: usize,
  pub kept: Vec<PathBuf>,
  pub protected: Vec<PathBuf>,
  pub deleted: Vec<PathBuf>,
}

impl TrimReport {
  pub fn deleted_count(&self) -> usize {
    self.deleted.len()
  }

  /// One line per decision, for the stage log.
  pub fn lines(&self) -> Vec<String> {
    let kept = self.kept.iter().map(|p| format!("keeping {}", p.display()));
    let protected = self.protected.iter().map(|p| format!("protected {}", p.display()));
    let deleted = self.deleted.iter().map(|p| format!("discarding {}", p.display()));
    kept.chain(protected).chain(deleted).collect()
  }
}

/// Trim the `libs` and `apps` halves of a codebase, in that order.
pub fn trim_codebase(codebase_dir: &Path, options: &TrimOptions) -> Result<Vec<TrimReport>, TrimError> {
  TRIMMED_SUBDIRS
    .iter()
    .map(|sub| trim_to_descriptors(codebase_dir, Path::new(sub), options))
    .collect()
}

/// Trim `codebase_dir/sub_dir` and everything it requires below it.
pub fn trim_to_descriptors(codebase_dir: &Path, sub_dir: &Path, options: &TrimOptions) -> Result<TrimReport, TrimError> {
  let mut report = TrimReport::default();
  trim_dir(codebase_dir, sub_dir, options, &mut report)?;

  info!(
    dir = %codebase_dir.join(sub_dir).display(),
    considered = report.dirs_considered,
    deleted = report.deleted.len(),
    dry_run = options.dry_run,
    "trimmed to descriptors"
  );

  Ok(report)
}

fn trim_dir(codebase_dir: &Path, sub_dir: &Path, options: &TrimOptions, report: &mut TrimReport) -> Result<(), TrimError> {
  let dir = codebase_dir.join(sub_dir);
  let required = required_subdirs(&dir);
  debug!(dir = %dir.display(), required = ?required, "trimming");

  let children = list_children(&dir)?;

  for (name, decision) in plan_children(&children, &required) {
    let path = dir.join(&name);
    report.dirs_considered += 1;

    match decision {
      TrimDecision::KeepProtected => {
        debug!(path = %path.display(), "protected");
        report.protected.push(path);
      }
      TrimDecision::Delete => {
        debug!(path = %path.display(), "discarding");
        if !options.dry_run {
          fs::remove_dir_all(&path).map_err(|source| TrimError::Delete {
            path: path.clone(),
            source,
          })?;
        }
        report.deleted.push(path);
      }
      TrimDecision::KeepRequired => {
        debug!(path = %path.display(), "keeping and recursing");
        report.kept.push(path);
        trim_dir(codebase_dir, &sub_dir.join(&name), options, report)?;
      }
    }
  }

  Ok(())
}

/// List `dir`, sorted by name. Entries with non-UTF-8 names are skipped.
fn list_children(dir: &Path) -> Result<Vec<ChildEntry>, TrimError> {
  let entries = fs::read_dir(dir).map_err(|source| TrimError::ReadDir {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut children = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| TrimError::ReadDir {
      path: dir.to_path_buf(),
      source,
    })?;
    let path = entry.path();
    let name = match entry.file_name().to_str() {
      Some(name) => name.to_string(),
      None => {
        warn!(path = %path.display(), "skipping entry with non UTF-8 name");
        continue;
      }
    };
    children.push(ChildEntry {
      name,
      is_dir: path.is_dir(),
    });
  }

  children.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(children)
}
