mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lrose_build_lib::config::BuildOptions;
use lrose_build_lib::config::release::{DEFAULT_TAG, LATEST};
use lrose_build_lib::platform::paths;

use crate::output::OutputFormat;

/// lrose-build - check out, trim, build and install an LROSE package
#[derive(Parser)]
#[command(name = "lrose-build")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Package to build: lrose-core, lrose-radx, lrose-cidd or samurai
  #[arg(long, default_value = "lrose-core")]
  package: String,

  /// Install directory
  #[arg(long, default_value_os_t = paths::default_prefix())]
  prefix: PathBuf,

  /// Temporary build directory, wiped at the start of a run
  #[arg(long, default_value_os_t = paths::default_build_dir())]
  build_dir: PathBuf,

  /// Directory for per-stage log files
  #[arg(long, default_value_os_t = paths::default_log_dir())]
  log_dir: PathBuf,

  /// Release date YYYYMMDD to check out, or "latest". Ignored when --tag is given
  #[arg(long, default_value = LATEST)]
  release_date: String,

  /// Git tag to check out
  #[arg(long, default_value = DEFAULT_TAG)]
  tag: String,

  /// Empty the build directory after a successful run
  #[arg(long)]
  clean: bool,

  /// Debug output from helper scripts (on by default)
  #[arg(long)]
  debug: bool,

  /// Verbose output; implies --debug
  #[arg(short, long)]
  verbose: bool,

  /// Link statically
  #[arg(long = "static")]
  static_link: bool,

  /// Copy every runtime library the binaries need next to them; wins over
  /// --install-lrose-runtime-libs
  #[arg(long)]
  install_all_runtime_libs: bool,

  /// Copy only the LROSE runtime libraries next to the binaries
  #[arg(long)]
  install_lrose_runtime_libs: bool,

  /// Skip installing perl modules and helper scripts
  #[arg(long)]
  no_scripts: bool,

  /// Build netcdf from lrose-netcdf into the scratch dir
  #[arg(long)]
  build_netcdf: bool,

  /// Also build fractl
  #[arg(long)]
  fractl: bool,

  /// Also build vortrac
  #[arg(long)]
  vortrac: bool,

  /// Also build samurai
  #[arg(long)]
  samurai: bool,

  /// Also build GeographicLib
  #[arg(long)]
  geolib: bool,

  /// Call cmake3 instead of cmake where supported
  #[arg(long)]
  cmake3: bool,

  /// Build and install the libraries only
  #[arg(long)]
  no_core_apps: bool,

  /// Build with jasper support
  #[arg(long)]
  with_jasper: bool,

  /// Have make print every command
  #[arg(long)]
  verbose_make: bool,

  /// Overwrite an existing build directory without asking
  #[arg(short, long)]
  force: bool,

  /// Report what trimming would delete under an existing codebase dir, then exit
  #[arg(long, value_name = "DIR")]
  dry_run_trim: Option<PathBuf>,

  /// Summary format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

impl Cli {
  fn build_options(&self) -> BuildOptions {
    let defaults = BuildOptions::default();
    BuildOptions {
      package: self.package.clone(),
      prefix: self.prefix.clone(),
      build_dir: self.build_dir.clone(),
      log_dir: self.log_dir.clone(),
      release_date: self.release_date.clone(),
      tag: self.tag.clone(),
      clean: self.clean,
      debug: self.debug || defaults.debug,
      verbose: self.verbose,
      static_link: self.static_link,
      install_all_runtime_libs: self.install_all_runtime_libs,
      install_lrose_runtime_libs: self.install_lrose_runtime_libs,
      no_scripts: self.no_scripts,
      build_netcdf: self.build_netcdf,
      build_fractl: self.fractl,
      build_vortrac: self.vortrac,
      build_samurai: self.samurai,
      build_geolib: self.geolib,
      use_cmake3: self.cmake3,
      no_core_apps: self.no_core_apps,
      with_jasper: self.with_jasper,
      verbose_make: self.verbose_make,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match &cli.dry_run_trim {
    Some(dir) => cmd::cmd_trim(dir, cli.output),
    None => cmd::cmd_build(&cli.build_options(), cli.force, cli.output),
  }
}
