//! Per-stage log files.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

const RULE: &str = "===========================================";

/// An open `<stage>.log`.
///
/// Child processes get duplicated handles of the same file, so their output
/// lands after whatever the runner wrote before starting them.
#[derive(Debug)]
pub struct StageLog {
  path: PathBuf,
  file: File,
}

impl StageLog {
  /// Path of the log file for `stage` inside `log_dir`.
  pub fn path_for(log_dir: &Path, stage: &str) -> PathBuf {
    log_dir.join(format!("{}.log", stage))
  }

  /// Create (or truncate) the log for `stage` and write its header.
  pub fn create(log_dir: &Path, stage: &str, script: &str) -> io::Result<Self> {
    fs::create_dir_all(log_dir)?;
    let path = Self::path_for(log_dir, stage);
    let file = File::create(&path)?;
    let mut log = Self { path, file };
    log.write_line(RULE)?;
    log.write_line(&format!("Log file from script: {}", script))?;
    log.write_line(stage)?;
    Ok(log)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn write_line(&mut self, line: &str) -> io::Result<()> {
    writeln!(self.file, "{}", line)
  }

  /// Handles for a child's stdout and stderr.
  pub fn child_stdio(&self) -> io::Result<(Stdio, Stdio)> {
    Ok((Stdio::from(self.file.try_clone()?), Stdio::from(self.file.try_clone()?)))
  }

  /// Flush and close.
  pub fn close(mut self) -> io::Result<()> {
    self.file.flush()?;
    self.file.sync_data()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn create_writes_header() {
    let temp = TempDir::new().unwrap();
    let log = StageLog::create(temp.path(), "run-cmake", "lrose-build").unwrap();
    let path = log.path().to_path_buf();
    log.close().unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(path, temp.path().join("run-cmake.log"));
    assert_eq!(contents, format!("{}\nLog file from script: lrose-build\nrun-cmake\n", RULE));
  }

  #[test]
  fn create_truncates_previous_log() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("build-libs.log"), "stale output from last run\n".repeat(10)).unwrap();

    let mut log = StageLog::create(temp.path(), "build-libs", "lrose-build").unwrap();
    log.write_line("fresh").unwrap();
    log.close().unwrap();

    let contents = fs::read_to_string(temp.path().join("build-libs.log")).unwrap();
    assert!(!contents.contains("stale"));
    assert!(contents.ends_with("build-libs\nfresh\n"));
  }

  #[test]
  fn create_makes_missing_log_dir() {
    let temp = TempDir::new().unwrap();
    let log_dir = temp.path().join("nested/logs");
    StageLog::create(&log_dir, "git-checkout", "lrose-build").unwrap();
    assert!(log_dir.join("git-checkout.log").exists());
  }
}
