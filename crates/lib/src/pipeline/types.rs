//! Types for stage execution.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::consts::NO_LOGGING_STAGE;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// A command ran and exited nonzero, or was killed by a signal.
  #[error("stage {stage}: command failed with exit code {code:?}: {cmd}")]
  CommandFailed {
    stage: String,
    cmd: String,
    code: Option<i32>,
  },

  /// A command could not be started at all.
  #[error("stage {stage}: failed to launch {cmd}: {source}")]
  Launch {
    stage: String,
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// A filesystem step of the stage failed.
  #[error("stage {stage}: failed on {path}: {source}")]
  Filesystem {
    stage: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The stage log could not be created.
  #[error("failed to create log file {path}: {source}")]
  Log {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// An earlier stage failed; nothing more runs.
  #[error("pipeline already aborted")]
  Aborted,
}

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  Pending,
  Running,
  Completed,
  Aborted,
}

impl RunState {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Aborted)
  }
}

/// An external program invocation with explicit arguments and directory.
///
/// Nothing goes through a shell: arguments reach the program verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  /// Merged over the inherited environment.
  pub env: BTreeMap<String, String>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
      env: BTreeMap::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Append a path argument.
  pub fn path_arg(self, path: &Path) -> Self {
    self.arg(path.display().to_string())
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
    self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// One unit of work inside a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  Run(CommandSpec),
  /// Remove a directory tree; a missing path is fine.
  RemoveDir(PathBuf),
  /// Create a directory and its parents; an existing one is fine.
  CreateDir(PathBuf),
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Step::Run(cmd) => write!(f, "{}", cmd),
      Step::RemoveDir(path) => write!(f, "remove {}", path.display()),
      Step::CreateDir(path) => write!(f, "mkdir {}", path.display()),
    }
  }
}

/// A named unit of pipeline work with its own log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
  pub name: String,
  pub steps: Vec<Step>,
}

impl PipelineStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      steps: Vec::new(),
    }
  }

  pub fn run(mut self, cmd: CommandSpec) -> Self {
    self.steps.push(Step::Run(cmd));
    self
  }

  pub fn remove_dir(mut self, path: impl Into<PathBuf>) -> Self {
    self.steps.push(Step::RemoveDir(path.into()));
    self
  }

  pub fn create_dir(mut self, path: impl Into<PathBuf>) -> Self {
    self.steps.push(Step::CreateDir(path.into()));
    self
  }

  pub fn push(&mut self, step: Step) {
    self.steps.push(step);
  }

  /// Whether this stage writes `<name>.log`.
  pub fn is_logged(&self) -> bool {
    self.name != NO_LOGGING_STAGE
  }
}

/// What a finished stage left behind.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
  pub name: String,
  pub log_path: Option<PathBuf>,
  pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn command_display_joins_args() {
    let cmd = CommandSpec::new("make", "/build").args(["-k", "-j", "8"]);
    assert_eq!(cmd.to_string(), "make -k -j 8");
  }

  #[test]
  fn env_is_merged() {
    let mut base = BTreeMap::new();
    base.insert("LDFLAGS".to_string(), "-L/lib".to_string());
    let cmd = CommandSpec::new("cmake", "/build").envs(&base).env("LROSE_INSTALL_DIR", "/opt");
    assert_eq!(cmd.env.len(), 2);
    assert_eq!(cmd.env["LDFLAGS"], "-L/lib");
  }

  #[test]
  fn no_logging_sentinel() {
    assert!(PipelineStage::new("run-cmake").is_logged());
    assert!(!PipelineStage::new(NO_LOGGING_STAGE).is_logged());
  }

  #[test]
  fn terminal_states() {
    assert!(RunState::Completed.is_terminal());
    assert!(RunState::Aborted.is_terminal());
    assert!(!RunState::Running.is_terminal());
    assert!(!RunState::Pending.is_terminal());
  }
}
