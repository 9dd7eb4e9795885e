//! Copying shared libraries next to the installed binaries.
//!
//! The copying itself is done by helper scripts shipped in the core
//! checkout. This module only decides which one to call and with what.

use serde::Serialize;

use crate::config::BuildConfiguration;
use crate::pipeline::{CommandSpec, PipelineStage};

pub const STAGE_NAME: &str = "install-runtime-libs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeLibStrategy {
  /// Every shared library the binaries link against.
  AllLibs,
  /// Only the libraries built from this checkout.
  LroseLibs,
}

impl RuntimeLibStrategy {
  /// `AllLibs` wins when both switches are somehow set.
  pub fn select(cfg: &BuildConfiguration) -> Option<Self> {
    if cfg.flags.install_all_runtime_libs {
      Some(Self::AllLibs)
    } else if cfg.flags.install_lrose_runtime_libs {
      Some(Self::LroseLibs)
    } else {
      None
    }
  }

  pub fn script_name(&self) -> &'static str {
    match self {
      Self::AllLibs => "installOriginLibFiles.py",
      Self::LroseLibs => "installOriginLroseLibs.py",
    }
  }

  /// The helper invocation, run from the codebase dir.
  pub fn command(&self, cfg: &BuildConfiguration) -> CommandSpec {
    let script = cfg.core_dir().join("build/scripts").join(self.script_name());
    let mut cmd = CommandSpec::new(script.display().to_string(), cfg.codebase_dir())
      .arg("--binDir")
      .path_arg(&cfg.scratch_bin_dir());
    if *self == Self::LroseLibs {
      cmd = cmd.arg("--libDir").path_arg(&cfg.scratch_lib_dir());
    }
    cmd = cmd.arg("--relDir").arg(cfg.runtime_lib_rel_dir.as_str());
    if let Some(flag) = cfg.debug_arg() {
      cmd = cmd.arg(flag);
    }
    cmd
  }
}

/// The runtime-libs stage, or `None` when neither switch is set.
pub fn runtime_libs_stage(cfg: &BuildConfiguration) -> Option<PipelineStage> {
  let strategy = RuntimeLibStrategy::select(cfg)?;
  Some(PipelineStage::new(STAGE_NAME).run(strategy.command(cfg)))
}
