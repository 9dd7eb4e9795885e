//! Optional add-on packages built after the core install.
//!
//! Every add-on goes through the same states,
//! `Clone → Configure → BuildAndInstall → [PostInstall] → Done`, and differs
//! only in repository, directory layout, environment and job count. An
//! [`ExternalDependency`] captures those differences; [`ExternalDependency::stage`]
//! walks the state machine and emits one pipeline stage named after the
//! add-on.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::BuildConfiguration;
use crate::pipeline::{CommandSpec, PipelineStage, Step};

/// The add-ons that can be requested, in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
  Geolib,
  Fractl,
  Vortrac,
  Samurai,
}

impl DependencyKind {
  pub const ALL: [DependencyKind; 4] = [Self::Geolib, Self::Fractl, Self::Vortrac, Self::Samurai];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Geolib => "geolib",
      Self::Fractl => "fractl",
      Self::Vortrac => "vortrac",
      Self::Samurai => "samurai",
    }
  }

  /// Whether the operator asked for this add-on.
  pub fn is_requested(&self, cfg: &BuildConfiguration) -> bool {
    match self {
      Self::Geolib => cfg.flags.build_geolib,
      Self::Fractl => cfg.flags.build_fractl,
      Self::Vortrac => cfg.flags.build_vortrac,
      Self::Samurai => cfg.flags.build_samurai,
    }
  }

  /// Requested add-ons in build order.
  pub fn requested(cfg: &BuildConfiguration) -> Vec<DependencyKind> {
    Self::ALL.into_iter().filter(|k| k.is_requested(cfg)).collect()
  }
}

impl fmt::Display for DependencyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyState {
  Clone,
  Configure,
  BuildAndInstall,
  PostInstall,
  Done,
}

impl DependencyState {
  /// The state after this one. `PostInstall` is skipped when there is
  /// nothing to copy.
  pub fn next(self, has_post_install: bool) -> Self {
    match self {
      Self::Clone => Self::Configure,
      Self::Configure => Self::BuildAndInstall,
      Self::BuildAndInstall if has_post_install => Self::PostInstall,
      Self::BuildAndInstall | Self::PostInstall | Self::Done => Self::Done,
    }
  }
}

/// An `rsync -av` run from the checkout after installing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInstallCopy {
  /// Arguments after `rsync -av`.
  pub args: Vec<String>,
}

/// Recipe for one add-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDependency {
  pub kind: DependencyKind,
  pub repo_url: String,
  pub dir_name: String,
  /// Out-of-source build directory inside the checkout, if any.
  pub build_subdir: Option<String>,
  /// Environment handed to configure and build.
  pub env: BTreeMap<String, String>,
  /// Configure program and arguments.
  pub configure: Vec<String>,
  /// One `make` invocation per entry.
  pub build_and_install: Vec<Vec<String>>,
  pub post_install: Vec<PostInstallCopy>,
}

impl ExternalDependency {
  /// The recipe for `kind` under `cfg`, with `base_env` layered under the
  /// add-on's own variables.
  pub fn for_kind(kind: DependencyKind, cfg: &BuildConfiguration, base_env: &BTreeMap<String, String>) -> Self {
    let prefix = cfg.prefix.display().to_string();
    let cmake = |honors_cmake3: bool| {
      if honors_cmake3 && cfg.flags.use_cmake3 {
        "cmake3"
      } else {
        "cmake"
      }
    };
    let install_strip = |jobs: u32| strings(&["make", "-k", "-j", &jobs.to_string(), "install/strip"]);
    let mut env = base_env.clone();

    match kind {
      DependencyKind::Geolib => {
        env.insert("LROSE_PREFIX".to_string(), prefix.clone());
        Self {
          kind,
          repo_url: "git://git.code.sourceforge.net/p/geographiclib/code".to_string(),
          dir_name: "geographiclib".to_string(),
          build_subdir: Some("BUILD".to_string()),
          env,
          configure: strings(&[cmake(true), "-D", &format!("CMAKE_INSTALL_PREFIX={}", prefix), ".."]),
          build_and_install: vec![strings(&["make", "-j", "4"]), strings(&["make", "install"])],
          post_install: Vec::new(),
        }
      }
      DependencyKind::Fractl => {
        env.insert("LROSE_INSTALL_DIR".to_string(), prefix);
        Self {
          kind,
          repo_url: "https://github.com/mmbell/fractl".to_string(),
          dir_name: "fractl".to_string(),
          build_subdir: None,
          env,
          configure: strings(&[cmake(false), "."]),
          build_and_install: vec![install_strip(4)],
          post_install: Vec::new(),
        }
      }
      DependencyKind::Vortrac => {
        env.insert("LROSE_INSTALL_DIR".to_string(), prefix.clone());
        let mut post_install = Vec::new();
        if cfg.os.is_macos() {
          post_install.push(PostInstallCopy {
            args: strings(&[
              "--include=*.xml",
              "--exclude=*",
              "Resources/",
              "vortrac.app/Contents/Resources/",
            ]),
          });
        }
        post_install.push(PostInstallCopy {
          args: strings(&["Resources", &prefix]),
        });
        Self {
          kind,
          repo_url: "https://github.com/mmbell/vortrac".to_string(),
          dir_name: "vortrac".to_string(),
          build_subdir: None,
          env,
          configure: strings(&[cmake(false), "."]),
          build_and_install: vec![install_strip(8)],
          post_install,
        }
      }
      DependencyKind::Samurai => {
        env.insert("LROSE_INSTALL_DIR".to_string(), prefix);
        Self {
          kind,
          repo_url: "https://github.com/mmbell/samurai".to_string(),
          dir_name: "samurai".to_string(),
          build_subdir: None,
          env,
          configure: strings(&[cmake(true), "."]),
          build_and_install: vec![install_strip(8)],
          post_install: Vec::new(),
        }
      }
    }
  }

  pub fn checkout_dir(&self, cfg: &BuildConfiguration) -> PathBuf {
    cfg.build_dir.join(&self.dir_name)
  }

  /// Where configure and make run.
  pub fn work_dir(&self, cfg: &BuildConfiguration) -> PathBuf {
    match &self.build_subdir {
      Some(sub) => self.checkout_dir(cfg).join(sub),
      None => self.checkout_dir(cfg),
    }
  }

  /// Steps performed in `state`.
  pub fn steps_for(&self, state: DependencyState, cfg: &BuildConfiguration) -> Vec<Step> {
    let work_dir = self.work_dir(cfg);
    let command = |argv: &[String], cwd: PathBuf| {
      let (program, rest) = argv.split_first()?;
      Some(Step::Run(
        CommandSpec::new(program.clone(), cwd)
          .args(rest.iter().cloned())
          .envs(&self.env),
      ))
    };

    match state {
      DependencyState::Clone => {
        let mut steps = vec![
          Step::RemoveDir(self.checkout_dir(cfg)),
          Step::Run(
            CommandSpec::new("git", cfg.build_dir.clone()).args(["clone", self.repo_url.as_str(), self.dir_name.as_str()]),
          ),
        ];
        if self.build_subdir.is_some() {
          steps.push(Step::CreateDir(work_dir));
        }
        steps
      }
      DependencyState::Configure => command(&self.configure, work_dir).into_iter().collect(),
      DependencyState::BuildAndInstall => self
        .build_and_install
        .iter()
        .filter_map(|argv| command(argv, work_dir.clone()))
        .collect(),
      DependencyState::PostInstall => self
        .post_install
        .iter()
        .map(|copy| {
          Step::Run(
            CommandSpec::new("rsync", self.checkout_dir(cfg))
              .arg("-av")
              .args(copy.args.iter().cloned()),
          )
        })
        .collect(),
      DependencyState::Done => Vec::new(),
    }
  }

  /// The whole build as one stage named after the add-on.
  pub fn stage(&self, cfg: &BuildConfiguration) -> PipelineStage {
    let mut stage = PipelineStage::new(self.kind.as_str());
    let has_post_install = !self.post_install.is_empty();
    let mut state = DependencyState::Clone;
    while state != DependencyState::Done {
      for step in self.steps_for(state, cfg) {
        stage.push(step);
      }
      state = state.next(has_post_install);
    }
    stage
  }
}

fn strings(values: &[&str]) -> Vec<String> {
  values.iter().map(|s| s.to_string()).collect()
}
