//! Directive extraction from build descriptor files.
//!
//! A descriptor (a `makefile` in the source tree) declares lists under named
//! keys, e.g.
//!
//! ```text
//! SUB_DIRS = \
//!     Radx \
//!     dataport
//! ```
//!
//! Only the first occurrence of a key is honored. The key is matched as a
//! plain substring, so `MY_SUB_DIRS` also matches `SUB_DIRS`.

use std::path::Path;

use tracing::{debug, trace};

const COMMENT_MARKER: char = '#';
const CONTINUATION_MARKER: char = '\\';
const ASSIGNMENT: char = '=';

/// Lines shorter than this (newline included) end a value.
const MIN_LINE_LEN: usize = 2;

/// The tokens declared for one key in one descriptor file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveRecord {
  pub key: String,
  pub values: Vec<String>,
}

impl DirectiveRecord {
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn contains(&self, value: &str) -> bool {
    self.values.iter().any(|v| v == value)
  }
}

/// Read `path` and extract the record for `key`.
pub fn read_directive(path: &Path, key: &str) -> DirectiveRecord {
  DirectiveRecord {
    key: key.to_string(),
    values: value_list_for_key(path, key),
  }
}

/// Return the tokens declared for `key` in the descriptor at `path`.
///
/// An unreadable file yields an empty list: to callers that is the same as
/// "nothing declared".
pub fn value_list_for_key(path: &Path, key: &str) -> Vec<String> {
  match std::fs::read_to_string(path) {
    Ok(contents) => parse_value_list(&contents, key),
    Err(e) => {
      debug!(path = %path.display(), error = %e, "cannot read descriptor");
      Vec::new()
    }
  }
}

/// Extract the tokens declared for `key` from descriptor `contents`.
pub fn parse_value_list(contents: &str, key: &str) -> Vec<String> {
  if key.is_empty() {
    return Vec::new();
  }

  let mut found = false;
  let mut value = String::new();

  for line in contents.split_inclusive('\n') {
    if !found && line.starts_with(COMMENT_MARKER) {
      continue;
    }

    if line.contains(key) {
      found = true;
    } else if found {
      if line.starts_with(COMMENT_MARKER) || line.len() < MIN_LINE_LEN {
        break;
      }
    } else {
      continue;
    }

    value.push_str(line);
    if !continues(line) {
      break;
    }
  }

  if !found {
    trace!(key, "key not declared");
    return Vec::new();
  }

  let value = value
    .replace(key, " ")
    .replace([ASSIGNMENT, '\t', CONTINUATION_MARKER, '\r', '\n'], " ");

  value
    .split(' ')
    .filter(|tok| !tok.is_empty())
    .map(str::to_string)
    .collect()
}

fn continues(line: &str) -> bool {
  line.trim_end().ends_with(CONTINUATION_MARKER)
}
