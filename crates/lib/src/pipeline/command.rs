//! Child process execution.

use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

use super::log::StageLog;
use super::types::CommandSpec;

/// Run `spec` to completion.
///
/// With a log, stdout and stderr are appended to it and stdin is closed.
/// Without one, the child shares the terminal but its stdout goes to our
/// stderr, so stdout only ever carries the run summary. The inherited
/// environment is kept and `spec.env` is layered on top.
pub async fn execute_command(spec: &CommandSpec, log: Option<&StageLog>) -> std::io::Result<ExitStatus> {
  let mut command = Command::new(&spec.program);
  command.args(&spec.args).current_dir(&spec.cwd).envs(&spec.env);

  if let Some(log) = log {
    let (stdout, stderr) = log.child_stdio()?;
    command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);
  } else {
    command.stdout(Stdio::from(std::io::stderr()));
  }

  debug!(program = %spec.program, working_dir = ?spec.cwd, "spawning process");

  let status = command.status().await?;
  debug!(cmd = %spec, code = ?status.code(), "child exited");
  Ok(status)
}
