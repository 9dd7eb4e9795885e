//! Stages that check out, configure and build the core package.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{BuildConfiguration, Package};
use crate::consts::{CMAKE_INSTALL_DIR, CORE_MAKE_JOBS, CORE_REPO_URL, DISPLAYS_REPO_URL, NETCDF_REPO_URL};
use crate::pipeline::{CommandSpec, PipelineStage};

/// Environment for every command from `print-environment` on.
///
/// The rpath lets installed binaries find their libraries in the runtime
/// lib dir next to them, in `../lib`, under the prefix, and in scratch.
/// `$$` is left for make to collapse.
pub fn build_env(cfg: &BuildConfiguration) -> BTreeMap<String, String> {
  let mut env = BTreeMap::new();
  let ldflags = format!(
    "-L{scratch_lib} -Wl,--enable-new-dtags,-rpath,'$$ORIGIN/{rel}:$$ORIGIN/../lib:{prefix_lib}:{scratch_lib}'",
    scratch_lib = cfg.scratch_lib_dir().display(),
    rel = cfg.runtime_lib_rel_dir,
    prefix_lib = cfg.prefix_lib_dir().display(),
  );
  env.insert("LDFLAGS".to_string(), ldflags);
  if cfg.os.is_macos() {
    env.insert("PKG_CONFIG_PATH".to_string(), "/usr/local/opt/qt/lib/pkgconfig".to_string());
  }
  env
}

/// Fresh clones of the core repository and its companions.
pub fn checkout_stage(cfg: &BuildConfiguration) -> PipelineStage {
  let git = || CommandSpec::new("git", cfg.build_dir.clone()).arg("clone");

  let mut core = git();
  if !cfg.release.is_master() {
    core = core.args(["--branch", cfg.release.tag.as_str()]);
  }
  let mut stage = PipelineStage::new("git-checkout")
    .remove_dir(cfg.core_dir())
    .run(core.arg(CORE_REPO_URL));

  if cfg.flags.build_netcdf {
    stage = stage.remove_dir(cfg.netcdf_dir()).run(git().arg(NETCDF_REPO_URL));
  }
  if cfg.package != Package::Samurai {
    stage = stage.remove_dir(cfg.displays_dir()).run(git().arg(DISPLAYS_REPO_URL));
  }
  stage
}

/// Put the package's descriptor files in place across the codebase.
pub fn package_makefiles_stage(cfg: &BuildConfiguration) -> PipelineStage {
  let script = helper(cfg, "build/scripts/installPackageMakefiles.py");
  PipelineStage::new("install-package-makefiles").run(
    CommandSpec::new(script, cfg.codebase_dir()).args(["--debug", "--package", cfg.package.as_str()]),
  )
}

/// Generate the CMake files for the trimmed tree.
pub fn cmake_lists_stage(cfg: &BuildConfiguration) -> PipelineStage {
  let mut cmd = CommandSpec::new(helper(cfg, "build/cmake/createCMakeLists.py"), cfg.codebase_dir());
  if let Some(flag) = cfg.debug_arg() {
    cmd = cmd.arg(flag);
  }
  if cfg.flags.static_link {
    cmd = cmd.arg("--static");
  }
  if cfg.flags.with_jasper {
    cmd = cmd.arg("--withJasper");
  }
  if cfg.flags.build_netcdf {
    cmd = cmd.arg("--dependDirs").path_arg(&cfg.scratch_dir());
  }
  if cfg.flags.verbose_make {
    cmd = cmd.arg("--verboseMake");
  }
  cmd = cmd.args(["--pkg", cfg.package.as_str(), "--installDir", CMAKE_INSTALL_DIR]);
  PipelineStage::new("create-CMakeLists-files").run(cmd)
}

/// Build netcdf into scratch with the script matching package and host.
pub fn netcdf_stage(cfg: &BuildConfiguration) -> PipelineStage {
  let script = if cfg.package == Package::LroseCidd {
    "build_and_install_netcdf.cidd_linux32"
  } else if cfg.os.is_macos() {
    "build_and_install_netcdf.osx"
  } else {
    "build_and_install_netcdf"
  };
  let program = cfg.netcdf_dir().join(script).display().to_string();
  PipelineStage::new("build-netcdf")
    .run(CommandSpec::new(program, cfg.netcdf_dir()).arg("-x").path_arg(&cfg.scratch_dir()))
}

pub fn print_env_stage(cfg: &BuildConfiguration, env: &BTreeMap<String, String>) -> PipelineStage {
  PipelineStage::new("print-environment").run(CommandSpec::new("env", cfg.build_dir.clone()).envs(env))
}

pub fn run_cmake_stage(cfg: &BuildConfiguration, env: &BTreeMap<String, String>) -> PipelineStage {
  PipelineStage::new("run-cmake").run(CommandSpec::new("cmake", cfg.codebase_dir()).arg(".").envs(env))
}

/// Which half of the codebase a make stage works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
  Libs,
  Apps,
}

impl Component {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Libs => "libs",
      Self::Apps => "apps",
    }
  }

  fn dir(&self, cfg: &BuildConfiguration) -> PathBuf {
    cfg.codebase_dir().join(self.as_str())
  }
}

/// `make -k -j 8` in the component dir.
pub fn make_stage(cfg: &BuildConfiguration, component: Component, env: &BTreeMap<String, String>) -> PipelineStage {
  PipelineStage::new(format!("build-{}", component.as_str())).run(
    CommandSpec::new("make", component.dir(cfg))
      .args(["-k", "-j", &CORE_MAKE_JOBS.to_string()])
      .envs(env),
  )
}

/// `make -k install/strip` into scratch.
pub fn make_install_stage(
  cfg: &BuildConfiguration,
  component: Component,
  env: &BTreeMap<String, String>,
) -> PipelineStage {
  PipelineStage::new(format!("install-{}-to-tmp", component.as_str())).run(
    CommandSpec::new("make", component.dir(cfg))
      .args(["-k", "install/strip"])
      .envs(env),
  )
}

/// Absolute path to a helper script inside the core checkout.
pub(crate) fn helper(cfg: &BuildConfiguration, relative: &str) -> String {
  cfg.core_dir().join(relative).display().to_string()
}
