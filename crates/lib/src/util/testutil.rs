//! Test helpers shared across modules.

use std::path::Path;

use crate::config::{BuildConfiguration, BuildOptions};
use crate::pipeline::CommandSpec;
use crate::platform::Os;

/// A `/bin/sh -c <script>` invocation in `cwd`.
pub fn sh(script: &str, cwd: &Path) -> CommandSpec {
  CommandSpec::new("/bin/sh", cwd).args(["-c", script])
}

/// A configuration rooted in `root`, built on a fixed date.
pub fn config_in(root: &Path, package: &str, os: Os, adjust: impl FnOnce(&mut BuildOptions)) -> BuildConfiguration {
  let mut options = BuildOptions {
    package: package.to_string(),
    prefix: root.join("prefix"),
    build_dir: root.join("build"),
    log_dir: root.join("build/logs"),
    debug: false,
    ..BuildOptions::default()
  };
  adjust(&mut options);
  let today = chrono::NaiveDate::from_ymd_opt(2024, 3, 9).unwrap_or_default();
  match BuildConfiguration::derive(&options, today, os) {
    Ok(cfg) => cfg,
    Err(e) => panic!("test configuration invalid: {}", e),
  }
}

/// Names of the commands' programs, in order.
pub fn programs(stage: &crate::pipeline::PipelineStage) -> Vec<String> {
  stage
    .steps
    .iter()
    .filter_map(|step| match step {
      crate::pipeline::Step::Run(cmd) => Some(cmd.program.clone()),
      _ => None,
    })
    .collect()
}
