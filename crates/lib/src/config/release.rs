//! Release tag and name selection.

use chrono::NaiveDate;
use serde::Serialize;

use super::{ConfigError, Package};

/// Default value of the tag option; any other value pins the checkout.
pub const DEFAULT_TAG: &str = "master";

/// Release date meaning "build today's tip of master".
pub const LATEST: &str = "latest";

/// Which revision gets checked out and what the release is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
  /// Branch or tag passed to `git clone`.
  pub tag: String,
  /// Name recorded in the release info file.
  pub name: String,
  /// Release date, unknown when an explicit tag was given.
  pub date: Option<NaiveDate>,
}

impl Release {
  /// Resolve the release from the tag and release date options.
  ///
  /// An explicit tag wins over the release date. Otherwise `latest` builds
  /// master named after `today`, and a `YYYYMMDD` date selects the
  /// `<package>-<YYYYMMDD>` tag.
  pub fn resolve(package: Package, tag: &str, release_date: &str, today: NaiveDate) -> Result<Self, ConfigError> {
    if tag != DEFAULT_TAG {
      return Ok(Self {
        tag: tag.to_string(),
        name: tag.to_string(),
        date: None,
      });
    }

    if release_date == LATEST {
      return Ok(Self {
        tag: DEFAULT_TAG.to_string(),
        name: format!("{}-{}", package, today.format("%Y%m%d")),
        date: Some(today),
      });
    }

    let date = parse_release_date(release_date)?;
    let tag = format!("{}-{}", package, date.format("%Y%m%d"));
    Ok(Self {
      name: tag.clone(),
      tag,
      date: Some(date),
    })
  }

  pub fn is_master(&self) -> bool {
    self.tag == DEFAULT_TAG
  }
}

/// Only the first eight characters are significant, so `20240115120000` works.
fn parse_release_date(value: &str) -> Result<NaiveDate, ConfigError> {
  let invalid = || ConfigError::InvalidReleaseDate(value.to_string());
  let digits = value.get(..8).ok_or_else(invalid)?;
  NaiveDate::parse_from_str(digits, "%Y%m%d").map_err(|_| invalid())
}
