//! Moving the build out of scratch and into the prefix.
//!
//! The stage builders look at the tree as it is when they are called, so
//! the orchestrator builds each one right before running it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{BuildConfiguration, Package};
use crate::consts::NO_LOGGING_STAGE;
use crate::pipeline::{CommandSpec, PipelineStage};
use crate::stages::helper;

pub const RELEASE_INFO_FILE: &str = "ReleaseInfo.txt";

fn rsync(cwd: impl Into<PathBuf>) -> CommandSpec {
  CommandSpec::new("rsync", cwd).arg("-av")
}

/// Perl modules and helper scripts. Only `lrose-core` ships them, and
/// `--no-scripts` turns them off.
pub fn scripts_stage(cfg: &BuildConfiguration) -> Option<PipelineStage> {
  if cfg.package != Package::LroseCore || cfg.flags.no_scripts {
    return None;
  }

  let perl5_install_dir = cfg.prefix_lib_dir().join("perl5");
  let mut stage = PipelineStage::new("install-scripts-to-tmp").create_dir(&perl5_install_dir);

  let perl5_src = cfg.codebase_dir().join("libs/perl5/src");
  let modules = perl_modules(&perl5_src);
  if !modules.is_empty() {
    stage = stage.run(rsync(&perl5_src).args(modules).path_arg(&perl5_install_dir));
  }

  for dir in ["apps/procmap/src/scripts", "apps/scripts/src"] {
    let dir = cfg.codebase_dir().join(dir);
    if dir.is_dir() {
      let installer = dir.join("install_scripts.lrose").display().to_string();
      stage = stage.run(CommandSpec::new(installer, &dir).path_arg(&cfg.prefix_scripts_dir()));
    }
  }
  Some(stage)
}

/// Names of the `*pm` files directly in `dir`, sorted.
fn perl_modules(dir: &Path) -> Vec<String> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) => {
      debug!(dir = %dir.display(), error = %e, "no perl5 sources");
      return Vec::new();
    }
  };
  let mut names: Vec<String> = entries
    .flatten()
    .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
    .filter_map(|entry| entry.file_name().into_string().ok())
    .filter(|name| name.ends_with("pm"))
    .collect();
  names.sort();
  names
}

/// Copy docs, color scales and the scratch tree into the prefix.
pub fn final_install_stage(cfg: &BuildConfiguration) -> PipelineStage {
  let prefix = cfg.prefix.display().to_string();
  let mut stage = PipelineStage::new("do-final-install")
    .create_dir(cfg.prefix_bin_dir())
    .create_dir(cfg.prefix_lib_dir())
    .create_dir(cfg.prefix_include_dir())
    .create_dir(cfg.prefix_share_dir());

  for item in ["LICENSE.txt", "release_notes", "docs"] {
    stage = stage.run(rsync(cfg.core_dir()).args([item, prefix.as_str()]));
  }
  if cfg.package == Package::LroseCidd {
    stage = stage.run(rsync(cfg.core_dir()).args(["./codebase/apps/cidd/src/CIDD/scripts", prefix.as_str()]));
  }

  if cfg.displays_dir().is_dir() {
    stage = stage.run(rsync(cfg.displays_dir()).arg("color_scales").path_arg(&cfg.prefix_share_dir()));
  }

  for dir in ["bin", "lib", "include"] {
    if cfg.scratch_dir().join(dir).is_dir() {
      stage = stage.run(rsync(cfg.scratch_dir()).args([dir, prefix.as_str()]));
    }
  }
  stage
}

/// Record package, date and release name in the core checkout.
pub fn write_release_info(cfg: &BuildConfiguration) -> io::Result<PathBuf> {
  let path = cfg.core_dir().join(RELEASE_INFO_FILE);
  let contents = format!(
    "package:{}\nversion:{}\nrelease:{}\n",
    cfg.package, cfg.date_str, cfg.release.name
  );
  fs::write(&path, contents)?;
  debug!(path = %path.display(), "wrote release info");
  Ok(path)
}

/// Verify the installed libs and apps. Output goes to the terminal.
pub fn check_install_stage(cfg: &BuildConfiguration) -> PipelineStage {
  let check = |script: &str| {
    CommandSpec::new(helper(cfg, script), cfg.core_dir())
      .arg("--prefix")
      .path_arg(&cfg.prefix)
      .args(["--package", cfg.package.as_str()])
  };

  let mut stage = PipelineStage::new(NO_LOGGING_STAGE).run(check("build/scripts/checkLibs.py"));
  if !cfg.flags.no_core_apps {
    stage = stage.run(check("build/scripts/checkApps.py"));
  }
  stage
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::Step;
  use crate::platform::Os;
  use crate::util::testutil::{config_in, programs};
  use tempfile::TempDir;

  fn commands(stage: &PipelineStage) -> Vec<&CommandSpec> {
    stage
      .steps
      .iter()
      .filter_map(|s| match s {
        Step::Run(cmd) => Some(cmd),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn scripts_only_for_core() {
    let temp = TempDir::new().unwrap();
    let radx = config_in(temp.path(), "lrose-radx", Os::Linux, |_| {});
    assert!(scripts_stage(&radx).is_none());

    let no_scripts = config_in(temp.path(), "lrose-core", Os::Linux, |o| o.no_scripts = true);
    assert!(scripts_stage(&no_scripts).is_none());
  }

  #[test]
  fn scripts_stage_on_bare_tree_only_creates_perl5_dir() {
    let temp = TempDir::new().unwrap();
    let cfg = config_in(temp.path(), "lrose-core", Os::Linux, |_| {});
    let stage = scripts_stage(&cfg).unwrap();

    assert_eq!(stage.steps, vec![Step::CreateDir(temp.path().join("prefix/lib/perl5"))]);
  }

  #[test]
  fn scripts_stage_copies_modules_and_runs_installers() {
    let temp = TempDir::new().unwrap();
    let cfg = config_in(temp.path(), "lrose-core", Os::Linux, |_| {});
    let perl5 = cfg.codebase_dir().join("libs/perl5/src");
    fs::create_dir_all(&perl5).unwrap();
    fs::write(perl5.join("Toolsa.pm"), "").unwrap();
    fs::write(perl5.join("Env.pm"), "").unwrap();
    fs::write(perl5.join("README"), "").unwrap();
    fs::create_dir_all(cfg.codebase_dir().join("apps/scripts/src")).unwrap();

    let stage = scripts_stage(&cfg).unwrap();
    let cmds = commands(&stage);
    assert_eq!(cmds.len(), 2);

    let prefix_perl5 = temp.path().join("prefix/lib/perl5").display().to_string();
    assert_eq!(cmds[0].args, vec!["-av", "Env.pm", "Toolsa.pm", prefix_perl5.as_str()]);
    assert_eq!(cmds[0].cwd, perl5);

    assert!(cmds[1].program.ends_with("apps/scripts/src/install_scripts.lrose"));
    assert_eq!(cmds[1].args, vec![temp.path().join("prefix/scripts").display().to_string()]);
  }

  #[test]
  fn final_install_copies_what_exists() {
    let temp = TempDir::new().unwrap();
    let cfg = config_in(temp.path(), "lrose-core", Os::Linux, |_| {});
    fs::create_dir_all(cfg.scratch_bin_dir()).unwrap();
    fs::create_dir_all(cfg.scratch_lib_dir()).unwrap();

    let stage = final_install_stage(&cfg);
    let args: Vec<String> = commands(&stage).iter().map(|c| c.args[1].clone()).collect();
    assert_eq!(args, vec!["LICENSE.txt", "release_notes", "docs", "bin", "lib"]);
    assert_eq!(
      stage.steps[..4],
      [
        Step::CreateDir(cfg.prefix_bin_dir()),
        Step::CreateDir(cfg.prefix_lib_dir()),
        Step::CreateDir(cfg.prefix_include_dir()),
        Step::CreateDir(cfg.prefix_share_dir()),
      ]
    );
  }

  #[test]
  fn final_install_for_cidd_with_displays() {
    let temp = TempDir::new().unwrap();
    let cfg = config_in(temp.path(), "lrose-cidd", Os::Linux, |_| {});
    fs::create_dir_all(cfg.displays_dir()).unwrap();

    let stage = final_install_stage(&cfg);
    let cmds = commands(&stage);
    assert_eq!(cmds[3].args[1], "./codebase/apps/cidd/src/CIDD/scripts");
    assert_eq!(cmds[4].args[1], "color_scales");
    assert_eq!(cmds[4].cwd, cfg.displays_dir());
    assert_eq!(cmds.len(), 5);
  }

  #[test]
  fn release_info_file() {
    let temp = TempDir::new().unwrap();
    let cfg = config_in(temp.path(), "lrose-radx", Os::Linux, |_| {});
    fs::create_dir_all(cfg.core_dir()).unwrap();

    let path = write_release_info(&cfg).unwrap();
    assert_eq!(path, cfg.core_dir().join("ReleaseInfo.txt"));
    assert_eq!(
      fs::read_to_string(path).unwrap(),
      "package:lrose-radx\nversion:20240309\nrelease:lrose-radx-20240309\n"
    );
  }

  #[test]
  fn release_info_needs_checkout() {
    let temp = TempDir::new().unwrap();
    let cfg = config_in(temp.path(), "lrose-core", Os::Linux, |_| {});
    assert!(write_release_info(&cfg).is_err());
  }

  #[test]
  fn check_install_is_unlogged() {
    let cfg = config_in(Path::new("/w"), "lrose-core", Os::Linux, |_| {});
    let stage = check_install_stage(&cfg);
    assert!(!stage.is_logged());
    assert_eq!(
      programs(&stage),
      vec![
        "/w/build/lrose-core/build/scripts/checkLibs.py",
        "/w/build/lrose-core/build/scripts/checkApps.py"
      ]
    );
    assert_eq!(
      commands(&stage)[0].args,
      vec!["--prefix", "/w/prefix", "--package", "lrose-core"]
    );

    let cfg = config_in(Path::new("/w"), "lrose-core", Os::Linux, |o| o.no_core_apps = true);
    assert_eq!(check_install_stage(&cfg).steps.len(), 1);
  }
}
