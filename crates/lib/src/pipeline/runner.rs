//! Sequential, fail-fast stage execution.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::command::execute_command;
use super::log::StageLog;
use super::types::{PipelineError, PipelineStage, RunState, StageRecord, Step};

/// Runs stages one after another, each with a fresh log.
///
/// The runner owns the only open log handle. Starting a stage closes the
/// previous stage's log first. The first failing step aborts the run: the
/// log is flushed, the state becomes [`RunState::Aborted`], and every later
/// stage is refused. Nothing done by earlier stages is rolled back.
#[derive(Debug)]
pub struct PipelineRunner {
  log_dir: PathBuf,
  script_name: String,
  state: RunState,
  log: Option<StageLog>,
  completed: Vec<StageRecord>,
}

impl PipelineRunner {
  pub fn new(log_dir: impl Into<PathBuf>, script_name: impl Into<String>) -> Self {
    Self {
      log_dir: log_dir.into(),
      script_name: script_name.into(),
      state: RunState::Pending,
      log: None,
      completed: Vec::new(),
    }
  }

  pub fn state(&self) -> RunState {
    self.state
  }

  pub fn log_dir(&self) -> &Path {
    &self.log_dir
  }

  /// Stages that ran to completion, in order.
  pub fn completed(&self) -> &[StageRecord] {
    &self.completed
  }

  pub fn current_log_path(&self) -> Option<&Path> {
    self.log.as_ref().map(StageLog::path)
  }

  /// Append a note to the current stage log, if there is one.
  pub fn log_line(&mut self, line: &str) {
    if let Some(log) = self.log.as_mut() {
      if let Err(e) = log.write_line(line) {
        warn!(path = %log.path().display(), error = %e, "failed to write to stage log");
      }
    }
  }

  /// Run every stage in order, stopping at the first failure.
  pub async fn run_all(&mut self, stages: &[PipelineStage]) -> Result<(), PipelineError> {
    for stage in stages {
      self.run_stage(stage).await?;
    }
    Ok(())
  }

  /// Run one stage.
  pub async fn run_stage(&mut self, stage: &PipelineStage) -> Result<(), PipelineError> {
    if self.state == RunState::Aborted {
      return Err(PipelineError::Aborted);
    }
    self.state = RunState::Running;
    self.close_log();

    info!("========================= {} =========================", stage.name);
    let start = Instant::now();

    if stage.is_logged() {
      match StageLog::create(&self.log_dir, &stage.name, &self.script_name) {
        Ok(log) => {
          debug!(path = %log.path().display(), "created log file");
          self.log = Some(log);
        }
        Err(source) => {
          return Err(self.abort(PipelineError::Log {
            path: StageLog::path_for(&self.log_dir, &stage.name),
            source,
          }));
        }
      }
    }

    for step in &stage.steps {
      if let Err(e) = self.run_step(&stage.name, step).await {
        return Err(self.abort(e));
      }
    }

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(stage = %stage.name, elapsed_ms, "stage complete");
    self.completed.push(StageRecord {
      name: stage.name.clone(),
      log_path: self.current_log_path().map(Path::to_path_buf),
      elapsed_ms,
    });
    Ok(())
  }

  /// Close the last log and report how the run ended.
  pub fn finish(mut self) -> RunState {
    self.close_log();
    if self.state != RunState::Aborted {
      self.state = RunState::Completed;
    }
    self.state
  }

  async fn run_step(&mut self, stage: &str, step: &Step) -> Result<(), PipelineError> {
    info!(stage, step = %step, "Running cmd");
    self.log_line(&format!("Running cmd: {}", step));

    match step {
      Step::Run(cmd) => {
        let status = execute_command(cmd, self.log.as_ref())
          .await
          .map_err(|source| PipelineError::Launch {
            stage: stage.to_string(),
            cmd: cmd.to_string(),
            source,
          })?;
        if !status.success() {
          return Err(PipelineError::CommandFailed {
            stage: stage.to_string(),
            cmd: cmd.to_string(),
            code: status.code(),
          });
        }
      }
      Step::RemoveDir(path) => {
        if path.exists() {
          tokio::fs::remove_dir_all(path)
            .await
            .map_err(|source| PipelineError::Filesystem {
              stage: stage.to_string(),
              path: path.clone(),
              source,
            })?;
        }
      }
      Step::CreateDir(path) => {
        if path.is_dir() {
          self.log_line(&format!("Dir exists: {}", path.display()));
        } else if let Err(e) = tokio::fs::create_dir_all(path).await {
          warn!(path = %path.display(), error = %e, "could not create dir");
          self.log_line(&format!("Could not create dir {}: {}", path.display(), e));
        }
      }
    }

    self.log_line("    done");
    Ok(())
  }

  /// Record `err` in the current stage log and stop the run.
  pub fn fail(&mut self, err: &dyn std::fmt::Display) {
    error!(error = %err, "pipeline aborted");
    self.log_line(&format!("ERROR: {}", err));
    self.close_log();
    self.state = RunState::Aborted;
  }

  fn abort(&mut self, err: PipelineError) -> PipelineError {
    self.fail(&err);
    err
  }

  fn close_log(&mut self) {
    if let Some(log) = self.log.take() {
      let path = log.path().to_path_buf();
      if let Err(e) = log.close() {
        warn!(path = %path.display(), error = %e, "failed to close stage log");
      }
    }
  }
}

impl Drop for PipelineRunner {
  fn drop(&mut self) {
    self.close_log();
  }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use super::*;
  use crate::consts::NO_LOGGING_STAGE;
  use crate::util::testutil::sh;
  use std::fs;
  use tempfile::TempDir;

  fn stage(name: &str, script: &str, cwd: &Path) -> PipelineStage {
    PipelineStage::new(name).run(sh(script, cwd))
  }

  #[tokio::test]
  async fn stages_run_in_order_with_own_logs() {
    let temp = TempDir::new().unwrap();
    let log_dir = temp.path().join("logs");
    let mut runner = PipelineRunner::new(&log_dir, "lrose-build");

    runner
      .run_all(&[
        stage("checkout", "echo one >> order.txt", temp.path()),
        stage("configure", "echo two >> order.txt", temp.path()),
      ])
      .await
      .unwrap();

    assert_eq!(runner.finish(), RunState::Completed);
    assert_eq!(fs::read_to_string(temp.path().join("order.txt")).unwrap(), "one\ntwo\n");
    let log = fs::read_to_string(log_dir.join("configure.log")).unwrap();
    assert!(log.contains("Log file from script: lrose-build\nconfigure\n"));
    assert!(log.contains("Running cmd: /bin/sh -c echo two >> order.txt"));
  }

  #[tokio::test]
  async fn failing_stage_stops_the_run() {
    let temp = TempDir::new().unwrap();
    let log_dir = temp.path().join("logs");
    let mut runner = PipelineRunner::new(&log_dir, "lrose-build");

    let result = runner
      .run_all(&[
        stage("checkout", "true", temp.path()),
        stage("configure", "echo configuring; exit 2", temp.path()),
        stage("build", "touch built", temp.path()),
      ])
      .await;

    match result {
      Err(PipelineError::CommandFailed { stage, code, .. }) => {
        assert_eq!(stage, "configure");
        assert_eq!(code, Some(2));
      }
      other => panic!("expected CommandFailed, got {:?}", other),
    }
    assert_eq!(runner.state(), RunState::Aborted);
    assert!(!temp.path().join("built").exists());
    assert!(log_dir.join("checkout.log").exists());
    assert!(log_dir.join("configure.log").exists());
    assert!(!log_dir.join("build.log").exists());

    let log = fs::read_to_string(log_dir.join("configure.log")).unwrap();
    assert!(log.contains("configuring"));
    assert!(log.contains("exit code Some(2)"));

    let names: Vec<_> = runner.completed().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["checkout"]);
    assert_eq!(runner.finish(), RunState::Aborted);
  }

  #[tokio::test]
  async fn aborted_runner_refuses_more_stages() {
    let temp = TempDir::new().unwrap();
    let mut runner = PipelineRunner::new(temp.path(), "lrose-build");

    assert!(runner.run_stage(&stage("first", "false", temp.path())).await.is_err());
    let result = runner.run_stage(&stage("second", "touch ran", temp.path())).await;

    assert!(matches!(result, Err(PipelineError::Aborted)));
    assert!(!temp.path().join("ran").exists());
  }

  #[tokio::test]
  async fn later_steps_of_failing_stage_do_not_run() {
    let temp = TempDir::new().unwrap();
    let mut runner = PipelineRunner::new(temp.path().join("logs"), "lrose-build");

    let failing = PipelineStage::new("build-libs")
      .run(sh("exit 1", temp.path()))
      .run(sh("touch installed", temp.path()));

    assert!(runner.run_stage(&failing).await.is_err());
    assert!(!temp.path().join("installed").exists());
  }

  #[tokio::test]
  async fn launch_failure_aborts() {
    let temp = TempDir::new().unwrap();
    let mut runner = PipelineRunner::new(temp.path().join("logs"), "lrose-build");
    let stage = PipelineStage::new("run-cmake").run(crate::pipeline::CommandSpec::new("/nonexistent/cmake", temp.path()));

    let result = runner.run_stage(&stage).await;

    assert!(matches!(result, Err(PipelineError::Launch { ref cmd, .. }) if cmd == "/nonexistent/cmake"));
    assert_eq!(runner.state(), RunState::Aborted);
  }

  #[tokio::test]
  async fn no_logging_stage_writes_no_log() {
    let temp = TempDir::new().unwrap();
    let log_dir = temp.path().join("logs");
    let mut runner = PipelineRunner::new(&log_dir, "lrose-build");

    runner.run_stage(&stage("do-final-install", "true", temp.path())).await.unwrap();
    assert!(runner.current_log_path().is_some());

    runner.run_stage(&stage(NO_LOGGING_STAGE, "true", temp.path())).await.unwrap();

    assert!(runner.current_log_path().is_none());
    assert!(!log_dir.join(format!("{}.log", NO_LOGGING_STAGE)).exists());
    assert_eq!(runner.finish(), RunState::Completed);
  }

  #[tokio::test]
  async fn filesystem_steps() {
    let temp = TempDir::new().unwrap();
    let stale = temp.path().join("lrose-core");
    fs::create_dir_all(stale.join("codebase")).unwrap();
    let mut runner = PipelineRunner::new(temp.path().join("logs"), "lrose-build");

    let stage = PipelineStage::new("git-checkout")
      .remove_dir(&stale)
      .remove_dir(temp.path().join("never-existed"))
      .create_dir(temp.path().join("prefix/bin"))
      .create_dir(temp.path().join("prefix/bin"));
    runner.run_stage(&stage).await.unwrap();

    assert!(!stale.exists());
    assert!(temp.path().join("prefix/bin").is_dir());
    let log = fs::read_to_string(temp.path().join("logs/git-checkout.log")).unwrap();
    assert!(log.contains("Dir exists"));
  }

  #[tokio::test]
  async fn log_line_goes_to_current_stage() {
    let temp = TempDir::new().unwrap();
    let mut runner = PipelineRunner::new(temp.path(), "lrose-build");

    runner.log_line("before any stage");
    runner.run_stage(&PipelineStage::new("install-package-makefiles")).await.unwrap();
    runner.log_line("discarding libs/unused");
    runner.finish();

    let log = fs::read_to_string(temp.path().join("install-package-makefiles.log")).unwrap();
    assert!(log.ends_with("discarding libs/unused\n"));
    assert!(!log.contains("before any stage"));
  }

  #[tokio::test]
  async fn failure_from_outside_is_logged_and_aborts() {
    let temp = TempDir::new().unwrap();
    let mut runner = PipelineRunner::new(temp.path(), "lrose-build");

    runner.run_stage(&PipelineStage::new("install-package-makefiles")).await.unwrap();
    runner.fail(&"failed to list directory libs");

    assert_eq!(runner.state(), RunState::Aborted);
    let err = runner.run_stage(&PipelineStage::new("run-cmake")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Aborted));
    let log = fs::read_to_string(temp.path().join("install-package-makefiles.log")).unwrap();
    assert!(log.ends_with("ERROR: failed to list directory libs\n"));
  }
}
