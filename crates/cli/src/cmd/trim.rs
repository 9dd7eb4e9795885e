//! `--dry-run-trim`: what trimming would delete from an existing codebase.

use std::path::Path;

use anyhow::{Context, Result};

use lrose_build_lib::trim::{TrimOptions, trim_codebase};

use crate::output::{OutputFormat, print_info, print_json, print_stat};

pub fn cmd_trim(codebase_dir: &Path, output: OutputFormat) -> Result<()> {
  let dir = dunce::canonicalize(codebase_dir)
    .with_context(|| format!("Cannot open codebase dir {}", codebase_dir.display()))?;

  let reports = trim_codebase(&dir, &TrimOptions { dry_run: true }).context("Trim failed")?;

  if output.is_json() {
    return print_json(&reports);
  }

  for line in reports.iter().flat_map(|r| r.lines()) {
    println!("  {}", line);
  }
  println!();
  print_info("Dry run - no changes made");
  print_stat("Dirs considered", &reports.iter().map(|r| r.dirs_considered).sum::<usize>().to_string());
  print_stat("Would delete", &reports.iter().map(|r| r.deleted_count()).sum::<usize>().to_string());

  Ok(())
}
