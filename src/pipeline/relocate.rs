//! Artifact relocator: move the built binary into the staging tree

use crate::core::error::{ShipResult, StageError};
use crate::pipeline::build::BuildArtifact;
use crate::pipeline::metadata::ReleaseVersion;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The binary at its place inside the staging tree
#[derive(Debug, PartialEq, Eq)]
pub struct StagedBinary {
  pub path: PathBuf,
  pub version: ReleaseVersion,
}

/// Move `artifact` into `staging_bin_dir`, replacing any file already there
///
/// Consumes the artifact: after a successful move it no longer exists at its
/// build location.
pub fn relocate(artifact: BuildArtifact, staging_bin_dir: &Path) -> ShipResult<StagedBinary> {
  let (from, version) = artifact.into_parts();
  let file_name = from.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  let to = staging_bin_dir.join(&file_name);

  let failed = |reason: String| StageError::RelocateFailed {
    from: from.clone(),
    to: to.clone(),
    reason,
  };

  if !from.is_file() {
    return Err(failed("build artifact is missing".to_string()).into());
  }
  if !staging_bin_dir.is_dir() {
    return Err(failed(format!("destination directory {} does not exist", staging_bin_dir.display())).into());
  }

  move_file(&from, &to).map_err(|e| failed(e.to_string()))?;
  tracing::debug!(from = %from.display(), to = %to.display(), "relocated artifact");

  Ok(StagedBinary { path: to, version })
}

/// Rename, falling back to copy + remove across filesystems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
  match fs::rename(from, to) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
      fs::copy(from, to)?;
      fs::remove_file(from)
    }
    Err(e) => Err(e),
  }
}
