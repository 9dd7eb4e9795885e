//! The full checkout-and-build run.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;

use lrose_build_lib::config::{BuildConfiguration, BuildOptions};
use lrose_build_lib::orchestrate::run;

use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success};
use crate::prompts::confirm_overwrite;

/// Validate the options, then check out, build and install.
///
/// Options are validated before anything touches the filesystem, so a bad
/// package name or release date fails without side effects.
pub fn cmd_build(options: &BuildOptions, force: bool, output: OutputFormat) -> Result<()> {
  let cfg = BuildConfiguration::from_options(options)?;
  let start = Instant::now();

  if !output.is_json() {
    print_info(&format!("Building {} ({})", cfg.package, cfg.release.name));
    print_stat("Tag", &cfg.release.tag);
    print_stat("Prefix", &cfg.prefix.display().to_string());
    print_stat("Build dir", &cfg.build_dir.display().to_string());
    print_stat("Log dir", &cfg.log_dir.display().to_string());
  }
  info!(config = ?cfg, "derived configuration");

  let mut confirm = |dir: &Path, contents: &[String]| confirm_overwrite(dir, contents, force);

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;
  let summary = rt.block_on(run(&cfg, &mut confirm)).context("Build failed")?;

  if output.is_json() {
    print_json(&summary)?;
    return Ok(());
  }

  println!();
  print_success(&format!("Installed {} in {}", summary.package, summary.prefix.display()));
  for stage in &summary.stages {
    print_stat(&stage.name, &format_duration(Duration::from_millis(stage.elapsed_ms)));
  }
  let deleted: usize = summary.trimmed.iter().map(|r| r.deleted_count()).sum();
  print_stat("Dirs trimmed", &deleted.to_string());
  if !summary.cleaned.is_empty() {
    print_stat("Cleaned", &summary.build_dir.display().to_string());
  }
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
