//! Workspace cleaner: remove outputs of a previous run
//!
//! Guarantees build and package start from a clean slate so a failed earlier
//! run cannot leave behind a binary or archive that would silently ship.

use crate::core::config::ShipConfig;
use crate::core::error::{ResultExt, ShipResult};
use crate::pipeline::package::matches_archive_template;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Paths removed by one cleaning pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
  pub removed: Vec<PathBuf>,
}

/// Prior outputs that currently exist
///
/// The staged binary, a build artifact left in the source workspace, and every
/// archive in the output directory named after the archive template (any version).
pub fn stale_outputs(config: &ShipConfig) -> ShipResult<Vec<PathBuf>> {
  let mut found: Vec<PathBuf> = [config.staged_binary_path(), config.built_artifact_path()]
    .into_iter()
    .filter(|p| p.is_file())
    .collect();

  let output_dir = &config.package.output_dir;
  if output_dir.is_dir() {
    found.extend(archives_in(output_dir, &config.package.archive_name)?);
  }

  Ok(found)
}

/// Archives in `dir` named after `template`, sorted
fn archives_in(dir: &Path, template: &str) -> ShipResult<Vec<PathBuf>> {
  let listing = || format!("Failed to list {}", dir.display());
  let mut archives = Vec::new();
  for entry in fs::read_dir(dir).with_context(listing)? {
    let entry = entry.with_context(listing)?;
    let name = entry.file_name();
    let Some(name) = name.to_str() else { continue };
    if entry.file_type().with_context(listing)?.is_file() && matches_archive_template(template, name) {
      archives.push(entry.path());
    }
  }
  archives.sort();
  Ok(archives)
}

/// Delete every stale output; missing files are not an error
pub fn clean_workspace(config: &ShipConfig) -> ShipResult<CleanReport> {
  let mut report = CleanReport::default();

  for path in stale_outputs(config)? {
    if remove_if_exists(&path).with_context(|| format!("Failed to remove {}", path.display()))? {
      tracing::debug!(path = %path.display(), "removed stale output");
      report.removed.push(path);
    }
  }

  Ok(report)
}

/// Remove a file, reporting whether it was there
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
  match fs::remove_file(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}
