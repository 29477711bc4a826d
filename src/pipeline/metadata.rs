//! Metadata reader: release version from the packaging control record

use crate::core::error::{ShipResult, StageError};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Key holding the release version in the control record
const VERSION_KEY: &str = "Version";

/// Version token read from the control record
///
/// Non-empty and free of whitespace; immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
  /// Validate a raw token
  pub fn parse(raw: &str) -> Result<Self, String> {
    let token = raw.trim();
    if token.is_empty() {
      return Err("`Version` is empty".to_string());
    }
    if token.chars().any(char::is_whitespace) {
      return Err(format!("`{}` contains whitespace", token));
    }
    Ok(Self(token.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ReleaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Read the control record and return its version
pub fn read_version(control_file: &Path) -> ShipResult<ReleaseVersion> {
  let not_found = |reason: String| StageError::VersionNotFound {
    path: control_file.to_path_buf(),
    reason,
  };

  let content = fs::read_to_string(control_file).map_err(|e| not_found(format!("cannot read file: {}", e)))?;
  let raw = find_version(&content).ok_or_else(|| not_found(format!("no `{}:` line", VERSION_KEY)))?;
  let version = ReleaseVersion::parse(raw).map_err(not_found)?;

  tracing::debug!(version = %version, control = %control_file.display(), "read release version");
  Ok(version)
}

/// Value after the first colon of the first `Version` line
///
/// Indented lines are continuations of the previous field and never match.
pub fn find_version(content: &str) -> Option<&str> {
  content.lines().find_map(|line| {
    let (key, value) = line.split_once(':')?;
    (key.trim_end() == VERSION_KEY).then(|| value.trim())
  })
}
