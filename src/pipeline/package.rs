//! Packager: turn the staging tree into one versioned archive

use crate::core::config::{ShipConfig, VERSION_PLACEHOLDER};
use crate::core::error::{ResultExt, ShipResult, StageError};
use crate::core::exec::{Invocation, ToolRunner};
use crate::pipeline::metadata::ReleaseVersion;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The distributable archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageArchive {
  pub path: PathBuf,
  pub version: ReleaseVersion,
  pub size: u64,
  pub sha256: String,
}

impl PackageArchive {
  /// Describe an archive already on disk (e.g. for a re-send)
  pub fn open(path: &Path, version: &ReleaseVersion) -> ShipResult<Self> {
    let size = fs::metadata(path)
      .with_context(|| format!("Package archive {} is not available", path.display()))?
      .len();
    let sha256 = sha256_file(path).with_context(|| format!("Failed to hash {}", path.display()))?;
    Ok(Self {
      path: path.to_path_buf(),
      version: version.clone(),
      size,
      sha256,
    })
  }

  pub fn file_name(&self) -> String {
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default()
  }
}

/// File name of the archive for `version`
pub fn archive_file_name(template: &str, version: &ReleaseVersion) -> String {
  template.replace(VERSION_PLACEHOLDER, version.as_str())
}

/// Full path of the archive for `version`
pub fn archive_path(config: &ShipConfig, version: &ReleaseVersion) -> PathBuf {
  config
    .package
    .output_dir
    .join(archive_file_name(&config.package.archive_name, version))
}

/// Whether `file_name` is an archive produced from `template` for some version
pub fn matches_archive_template(template: &str, file_name: &str) -> bool {
  let Some((prefix, suffix)) = template.split_once(VERSION_PLACEHOLDER) else {
    return template == file_name;
  };
  file_name.len() > prefix.len() + suffix.len() && file_name.starts_with(prefix) && file_name.ends_with(suffix)
}

/// Packaging tool call for `version`
pub fn package_invocation(config: &ShipConfig, version: &ReleaseVersion) -> Invocation {
  Invocation::new(&config.package.tool)
    .arg("--build")
    .arg(config.package_root.to_string_lossy())
    .arg(archive_path(config, version).to_string_lossy())
    .timeout(Duration::from_secs(config.package.timeout_secs))
}

/// Build the archive from the staging tree
pub fn package(runner: &dyn ToolRunner, config: &ShipConfig, version: &ReleaseVersion) -> ShipResult<PackageArchive> {
  let output_dir = &config.package.output_dir;
  fs::create_dir_all(output_dir).with_context(|| format!("Failed to create {}", output_dir.display()))?;

  let invocation = package_invocation(config, version);
  let output = runner
    .run(&invocation)
    .map_err(|e| StageError::PackageFailed(invocation.spawn_failure(&e)))?;

  if !output.success() {
    return Err(StageError::PackageFailed(invocation.failure(&output)).into());
  }

  let path = archive_path(config, version);
  if !path.is_file() {
    let mut failure = invocation.failure(&output);
    failure.output = format!("packaging tool exited successfully but {} was not produced", path.display());
    return Err(StageError::PackageFailed(failure).into());
  }

  let archive = PackageArchive::open(&path, version)?;
  tracing::debug!(archive = %archive.path.display(), size = archive.size, sha256 = %archive.sha256, "packaged");
  Ok(archive)
}

fn sha256_file(path: &Path) -> io::Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  io::copy(&mut file, &mut hasher)?;
  Ok(format!("{:x}", hasher.finalize()))
}
