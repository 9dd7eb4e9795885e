//! One complete checkout-and-build run.
//!
//! [`plan`] fixes the order of everything a run does for a given
//! configuration. [`run`] prepares the build dir and walks that plan: most
//! phases are pipeline stages, the rest (trimming, the release info file,
//! pruning) happen in-process and note what they did in the current stage
//! log. The first failure ends the run; nothing is rolled back.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{BuildConfiguration, ConfigError, Package, Release};
use crate::consts::APP_NAME;
use crate::external::{DependencyKind, ExternalDependency};
use crate::install::{
  RELEASE_INFO_FILE, check_install_stage, final_install_stage, scripts_stage, write_release_info,
};
use crate::pipeline::{PipelineError, PipelineRunner, PipelineStage, RunState, StageRecord};
use crate::runtime_libs::{RuntimeLibStrategy, runtime_libs_stage};
use crate::setup::{Confirm, SetupError, SetupReport, clean_build_dir, prepare_build_dir};
use crate::stages::{
  Component, build_env, checkout_stage, cmake_lists_stage, make_install_stage, make_stage, netcdf_stage,
  package_makefiles_stage, print_env_stage, run_cmake_stage,
};
use crate::trim::{PruneReport, TrimError, TrimOptions, TrimReport, prune_empty_dirs, trim_codebase};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Setup(#[from] SetupError),

  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error("trimming failed: {0}")]
  Trim(#[from] TrimError),

  #[error("failed to write {path}: {source}")]
  ReleaseInfo {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// One step of a run, in the order [`plan`] returns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Checkout,
  PackageMakefiles,
  Trim,
  CMakeLists,
  ReleaseInfo,
  Prune,
  Netcdf,
  PrintEnvironment,
  RunCmake,
  Build(Component),
  Install(Component),
  Scripts,
  RuntimeLibs,
  FinalInstall,
  CheckInstall,
  External(DependencyKind),
}

impl Phase {
  /// Stage name for pipeline phases, a short label for the others.
  pub fn name(&self) -> String {
    match self {
      Self::Checkout => "git-checkout".to_string(),
      Self::PackageMakefiles => "install-package-makefiles".to_string(),
      Self::Trim => "trim".to_string(),
      Self::CMakeLists => "create-CMakeLists-files".to_string(),
      Self::ReleaseInfo => "release-info".to_string(),
      Self::Prune => "prune".to_string(),
      Self::Netcdf => "build-netcdf".to_string(),
      Self::PrintEnvironment => "print-environment".to_string(),
      Self::RunCmake => "run-cmake".to_string(),
      Self::Build(c) => format!("build-{}", c.as_str()),
      Self::Install(c) => format!("install-{}-to-tmp", c.as_str()),
      Self::Scripts => "install-scripts-to-tmp".to_string(),
      Self::RuntimeLibs => crate::runtime_libs::STAGE_NAME.to_string(),
      Self::FinalInstall => "do-final-install".to_string(),
      Self::CheckInstall => crate::consts::NO_LOGGING_STAGE.to_string(),
      Self::External(kind) => kind.as_str().to_string(),
    }
  }

  /// The pipeline stage for this phase, built against the tree as it is
  /// now. `None` for in-process phases and for optional stages with nothing
  /// to do.
  pub fn stage(&self, cfg: &BuildConfiguration, env: &BTreeMap<String, String>) -> Option<PipelineStage> {
    match self {
      Self::Checkout => Some(checkout_stage(cfg)),
      Self::PackageMakefiles => Some(package_makefiles_stage(cfg)),
      Self::CMakeLists => Some(cmake_lists_stage(cfg)),
      Self::Netcdf => Some(netcdf_stage(cfg)),
      Self::PrintEnvironment => Some(print_env_stage(cfg, env)),
      Self::RunCmake => Some(run_cmake_stage(cfg, env)),
      Self::Build(c) => Some(make_stage(cfg, *c, env)),
      Self::Install(c) => Some(make_install_stage(cfg, *c, env)),
      Self::Scripts => scripts_stage(cfg),
      Self::RuntimeLibs => runtime_libs_stage(cfg),
      Self::FinalInstall => Some(final_install_stage(cfg)),
      Self::CheckInstall => Some(check_install_stage(cfg)),
      Self::External(kind) => Some(ExternalDependency::for_kind(*kind, cfg, env).stage(cfg)),
      Self::Trim | Self::ReleaseInfo | Self::Prune => None,
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// Everything a run with `cfg` will do, in order.
pub fn plan(cfg: &BuildConfiguration) -> Vec<Phase> {
  let mut phases = vec![
    Phase::Checkout,
    Phase::PackageMakefiles,
    Phase::Trim,
    Phase::CMakeLists,
    Phase::ReleaseInfo,
    Phase::Prune,
  ];
  if cfg.flags.build_netcdf {
    phases.push(Phase::Netcdf);
  }
  phases.extend([
    Phase::PrintEnvironment,
    Phase::RunCmake,
    Phase::Build(Component::Libs),
    Phase::Install(Component::Libs),
  ]);
  if !cfg.flags.no_core_apps {
    phases.extend([Phase::Build(Component::Apps), Phase::Install(Component::Apps)]);
  }
  if cfg.package == Package::LroseCore && !cfg.flags.no_scripts {
    phases.push(Phase::Scripts);
  }
  if RuntimeLibStrategy::select(cfg).is_some() {
    phases.push(Phase::RuntimeLibs);
  }
  phases.extend([Phase::FinalInstall, Phase::CheckInstall]);
  phases.extend(DependencyKind::requested(cfg).into_iter().map(Phase::External));
  phases
}

/// What a finished run did.
#[derive(Debug, Serialize)]
pub struct BuildSummary {
  pub package: Package,
  pub release: Release,
  pub prefix: PathBuf,
  pub build_dir: PathBuf,
  pub log_dir: PathBuf,
  pub state: RunState,
  pub setup: SetupReport,
  pub stages: Vec<StageRecord>,
  pub trimmed: Vec<TrimReport>,
  pub pruned: Option<PruneReport>,
  pub release_info: Option<PathBuf>,
  /// Paths removed by `--clean`.
  pub cleaned: Vec<PathBuf>,
}

impl BuildSummary {
  fn new(cfg: &BuildConfiguration, setup: SetupReport) -> Self {
    Self {
      package: cfg.package,
      release: cfg.release.clone(),
      prefix: cfg.prefix.clone(),
      build_dir: cfg.build_dir.clone(),
      log_dir: cfg.log_dir.clone(),
      state: RunState::Pending,
      setup,
      stages: Vec::new(),
      trimmed: Vec::new(),
      pruned: None,
      release_info: None,
      cleaned: Vec::new(),
    }
  }
}

/// Prepare the build dir, then check out, build and install.
pub async fn run(cfg: &BuildConfiguration, confirm: &mut dyn Confirm) -> Result<BuildSummary, BuildError> {
  let setup = prepare_build_dir(cfg, confirm)?;
  let runner = PipelineRunner::new(cfg.log_dir.clone(), APP_NAME);
  run_phases(cfg, runner, BuildSummary::new(cfg, setup), &plan(cfg)).await
}

/// Walk `phases` with `runner`, then clean up if asked to.
pub async fn run_phases(
  cfg: &BuildConfiguration,
  mut runner: PipelineRunner,
  mut summary: BuildSummary,
  phases: &[Phase],
) -> Result<BuildSummary, BuildError> {
  let env = build_env(cfg);
  info!(
    package = %cfg.package,
    release = %cfg.release.name,
    prefix = %cfg.prefix.display(),
    phases = phases.len(),
    "starting build"
  );

  for phase in phases {
    debug!(phase = %phase, "phase");
    match phase {
      Phase::Trim => {
        let reports = match trim_codebase(&cfg.codebase_dir(), &TrimOptions::default()) {
          Ok(reports) => reports,
          Err(e) => {
            runner.fail(&e);
            return Err(e.into());
          }
        };
        for report in reports {
          for line in report.lines() {
            runner.log_line(&line);
          }
          summary.trimmed.push(report);
        }
      }
      Phase::ReleaseInfo => {
        let path = match write_release_info(cfg) {
          Ok(path) => path,
          Err(source) => {
            let err = BuildError::ReleaseInfo {
              path: cfg.core_dir().join(RELEASE_INFO_FILE),
              source,
            };
            runner.fail(&err);
            return Err(err);
          }
        };
        runner.log_line(&format!("Wrote {}", path.display()));
        summary.release_info = Some(path);
      }
      Phase::Prune => {
        let report = match prune_empty_dirs(&cfg.codebase_dir()) {
          Ok(report) => report,
          Err(e) => {
            runner.fail(&e);
            return Err(e.into());
          }
        };
        runner.log_line(&format!(
          "Pruned {} vcs dirs and {} empty dirs",
          report.vcs_dirs.len(),
          report.empty_dirs.len()
        ));
        summary.pruned = Some(report);
      }
      other => match other.stage(cfg, &env) {
        Some(stage) => runner.run_stage(&stage).await?,
        None => debug!(phase = %other, "nothing to do"),
      },
    }
  }

  summary.stages = runner.completed().to_vec();
  summary.state = runner.finish();

  if cfg.flags.clean {
    summary.cleaned = clean_build_dir(cfg)?;
  }

  info!(prefix = %cfg.prefix.display(), "build complete");
  Ok(summary)
}
