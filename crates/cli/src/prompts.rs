use std::io::{self, IsTerminal, Write};
use std::path::Path;

use anyhow::{Result, bail};

use crate::output::{print_error, print_warning};

pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --force to proceed.");
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Ask before wiping an existing build dir. Any prompt failure counts as no.
pub fn confirm_overwrite(dir: &Path, contents: &[String], force: bool) -> bool {
  if !force {
    print_warning(&format!("About to remove all contents of {}", dir.display()));
    for name in contents {
      eprintln!("  {}", name);
    }
  }

  match confirm("Do you wish to proceed?", force) {
    Ok(answer) => answer,
    Err(e) => {
      print_error(&e.to_string());
      false
    }
  }
}
