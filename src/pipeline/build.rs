//! Cross builder: compile the agent with the release version baked in
//!
//! The target OS/architecture pair travels on the compiler's own environment
//! (`GOOS`/`GOARCH` by default). Nothing is set on this process, so running
//! the pipeline repeatedly or for several targets cannot leak settings.

use crate::core::config::BuildConfig;
use crate::core::config::ShipConfig;
use crate::core::error::{ShipResult, StageError};
use crate::core::exec::{Invocation, ToolRunner};
use crate::pipeline::metadata::ReleaseVersion;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The compiled executable, still in the source workspace
///
/// Deliberately not `Clone`: the relocator consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct BuildArtifact {
  path: PathBuf,
  version: ReleaseVersion,
}

impl BuildArtifact {
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn version(&self) -> &ReleaseVersion {
    &self.version
  }

  pub(crate) fn into_parts(self) -> (PathBuf, ReleaseVersion) {
    (self.path, self.version)
  }
}

/// Compiler call for `version`
pub fn build_invocation(config: &ShipConfig, version: &ReleaseVersion) -> Invocation {
  let build: &BuildConfig = &config.build;
  Invocation::new(&build.compiler)
    .args(["build", "-ldflags"])
    .arg(format!("-X {}={}", build.version_symbol, version))
    .args(["-o", build.binary_name.as_str()])
    .current_dir(&config.source_dir)
    .env(&build.os_env, &build.target_os)
    .env(&build.arch_env, &build.target_arch)
    .timeout(Duration::from_secs(build.timeout_secs))
}

/// Run the compiler and hand back the artifact it produced
pub fn cross_build(runner: &dyn ToolRunner, config: &ShipConfig, version: &ReleaseVersion) -> ShipResult<BuildArtifact> {
  let invocation = build_invocation(config, version);
  let output = runner
    .run(&invocation)
    .map_err(|e| StageError::BuildFailed(invocation.spawn_failure(&e)))?;

  if !output.success() {
    return Err(StageError::BuildFailed(invocation.failure(&output)).into());
  }

  let path = config.built_artifact_path();
  if !path.is_file() {
    let mut failure = invocation.failure(&output);
    failure.output = format!("compiler exited successfully but {} was not produced", path.display());
    return Err(StageError::BuildFailed(failure).into());
  }

  let artifact = BuildArtifact {
    path,
    version: version.clone(),
  };

  if config.build.verify_version {
    verify_version(runner, &artifact, config.build.timeout_secs)?;
  }

  Ok(artifact)
}

/// Execute the binary with `--version` and compare against the stamped version
pub fn verify_version(runner: &dyn ToolRunner, artifact: &BuildArtifact, timeout_secs: u64) -> ShipResult<()> {
  let invocation = Invocation::new(artifact.path.to_string_lossy())
    .arg("--version")
    .timeout(Duration::from_secs(timeout_secs));
  let output = runner
    .run(&invocation)
    .map_err(|e| StageError::BuildFailed(invocation.spawn_failure(&e)))?;

  if !output.success() {
    return Err(StageError::BuildFailed(invocation.failure(&output)).into());
  }

  let reported = output.stdout.trim();
  if reported != artifact.version.as_str() {
    return Err(
      StageError::VersionMismatch {
        expected: artifact.version.to_string(),
        reported: reported.to_string(),
      }
      .into(),
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ShipError;
  use crate::core::exec::testing::RecordingRunner;
  use crate::core::exec::ToolOutput;
  use std::fs;
  use std::io;
  use tempfile::TempDir;

  fn setup() -> (TempDir, ShipConfig) {
    let dir = TempDir::new().unwrap();
    let mut config = ShipConfig::parse(
      r#"
source_dir = "src-agent"
staging_bin_dir = "build/usr/local/bin"
package_root = "build"
targets = ["A"]
"#,
    )
    .unwrap();
    config.resolve_paths(dir.path());
    fs::create_dir_all(&config.source_dir).unwrap();
    (dir, config)
  }

  fn version() -> ReleaseVersion {
    ReleaseVersion::parse("1.4.2").unwrap()
  }

  #[test]
  fn test_invocation_stamps_version_and_target() {
    let (_dir, config) = setup();
    let inv = build_invocation(&config, &version());
    assert_eq!(inv.program, "go");
    assert_eq!(inv.args, vec!["build", "-ldflags", "-X main.version=1.4.2", "-o", "agent"]);
    assert_eq!(inv.cwd.as_deref(), Some(config.source_dir.as_path()));
    assert_eq!(
      inv.env,
      vec![
        ("GOOS".to_string(), "linux".to_string()),
        ("GOARCH".to_string(), "amd64".to_string())
      ]
    );
    assert_eq!(inv.timeout, Duration::from_secs(600));
  }

  #[test]
  fn test_successful_build_yields_artifact() {
    let (_dir, config) = setup();
    let artifact_path = config.built_artifact_path();
    let runner = RecordingRunner::succeeding().with_effect(move |_| {
      fs::write(&artifact_path, "bin").unwrap();
    });

    let artifact = cross_build(&runner, &config, &version()).unwrap();
    assert_eq!(artifact.path(), config.built_artifact_path());
    assert_eq!(artifact.version().as_str(), "1.4.2");
    assert_eq!(runner.calls().len(), 1);
  }

  #[test]
  fn test_nonzero_exit_is_build_failed() {
    let (_dir, config) = setup();
    let runner = RecordingRunner::failing_when(|_| true);
    let err = cross_build(&runner, &config, &version()).unwrap_err();
    match err {
      ShipError::Stage(StageError::BuildFailed(failure)) => {
        assert_eq!(failure.status, Some(1));
        assert!(failure.output.contains("simulated failure"));
      }
      other => panic!("unexpected error: {}", other),
    }
  }

  #[test]
  fn test_success_without_artifact_is_build_failed() {
    let (_dir, config) = setup();
    let runner = RecordingRunner::succeeding();
    let err = cross_build(&runner, &config, &version()).unwrap_err();
    assert!(err.to_string().contains("was not produced"));
  }

  struct VersionPrinter(&'static str);

  impl ToolRunner for VersionPrinter {
    fn run(&self, _invocation: &Invocation) -> io::Result<ToolOutput> {
      Ok(ToolOutput {
        code: Some(0),
        stdout: format!("{}\n", self.0),
        ..Default::default()
      })
    }
  }

  #[test]
  fn test_verify_version_round_trip() {
    let artifact = BuildArtifact {
      path: PathBuf::from("/tmp/agent"),
      version: version(),
    };
    assert!(verify_version(&VersionPrinter("1.4.2"), &artifact, 5).is_ok());

    let err = verify_version(&VersionPrinter("dev"), &artifact, 5).unwrap_err();
    assert!(matches!(err, ShipError::Stage(StageError::VersionMismatch { .. })));
  }
}
