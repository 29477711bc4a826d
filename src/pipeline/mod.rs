//! The build → package → distribute release pipeline
//!
//! Stages run strictly in order and each one's success is the precondition
//! for the next:
//!
//! 1. **metadata**: read the release version from the control record
//! 2. **clean**: remove outputs of a previous run
//! 3. **build**: cross-compile with the version stamped in
//! 4. **relocate**: move the binary into the staging tree
//! 5. **package**: build the versioned archive
//! 6. **distribute**: ship archive + auxiliary files to every host
//!
//! Every stage returns a `ShipResult`; the first error ends the run.

pub mod build;
pub mod clean;
pub mod distribute;
pub mod metadata;
pub mod package;
pub mod relocate;

use crate::core::config::{FailurePolicy, ShipConfig};
use crate::core::error::ShipResult;
use crate::core::exec::ToolRunner;
use crate::core::plan::{Operation, Plan, Stage};
use crate::ui::{HostProgress, Printer};
use chrono::{DateTime, Utc};
use distribute::{DeploymentBundle, DistributionReport, Distributor, HostEvent, HostStatus};
use metadata::ReleaseVersion;
use package::PackageArchive;
use serde::Serialize;
use std::path::PathBuf;

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
  pub version: ReleaseVersion,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub cleaned: Vec<PathBuf>,
  pub staged_binary: PathBuf,
  pub archive: PackageArchive,
  pub distribution: DistributionReport,
}

/// One configured release run
pub struct Pipeline<'a> {
  config: &'a ShipConfig,
  runner: &'a dyn ToolRunner,
  printer: Printer,
  policy: FailurePolicy,
  show_progress: bool,
}

impl<'a> Pipeline<'a> {
  pub fn new(config: &'a ShipConfig, runner: &'a dyn ToolRunner, printer: Printer) -> Self {
    Self {
      config,
      runner,
      printer,
      policy: config.distribute.on_failure,
      show_progress: !printer.is_json(),
    }
  }

  /// Override the configured continue-vs-abort choice
  pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
    self.policy = policy;
    self
  }

  #[cfg(test)]
  pub fn with_progress(mut self, show: bool) -> Self {
    self.show_progress = show;
    self
  }

  /// Read the version from the control record
  pub fn read_version(&self) -> ShipResult<ReleaseVersion> {
    self.printer.step("🔍 Reading release version...");
    let version = metadata::read_version(&self.config.control_file())?;
    self.printer.step(format!("   Version: {}", version));
    Ok(version)
  }

  /// Run every stage in order
  ///
  /// Under the `continue` policy a run with failed hosts still returns `Ok`;
  /// inspect `distribution` (or call `ensure_complete`) afterwards.
  pub fn run(&self) -> ShipResult<ReleaseReport> {
    let started_at = Utc::now();
    let config = self.config;

    let version = self.read_version()?;

    self.printer.step("🧹 Cleaning up previous outputs...");
    let cleaned = clean::clean_workspace(config)?;
    for path in &cleaned.removed {
      self.printer.step(format!("   Removed {}", path.display()));
    }

    self.printer.step(format!(
      "🔨 Building {} {} for {}/{}...",
      config.build.binary_name, version, config.build.target_os, config.build.target_arch
    ));
    let artifact = build::cross_build(self.runner, config, &version)?;
    tracing::debug!(artifact = %artifact.path().display(), version = %artifact.version(), "built");

    self.printer.step("📁 Moving the built binary into the staging tree...");
    let staged = relocate::relocate(artifact, &config.staging_bin_dir)?;
    self.printer.step(format!("   {}", staged.path.display()));

    self.printer.step("📦 Building the package...");
    let archive = package::package(self.runner, config, &version)?;
    self.printer.step(format!(
      "   {} ({} bytes, sha256 {})",
      archive.path.display(),
      archive.size,
      &archive.sha256[..12.min(archive.sha256.len())]
    ));

    let distribution = self.distribute(&archive, &config.targets)?;

    Ok(ReleaseReport {
      version,
      started_at,
      finished_at: Utc::now(),
      cleaned: cleaned.removed,
      staged_binary: staged.path,
      archive,
      distribution,
    })
  }

  /// Ship an archive to `hosts` (a subset of the configured targets, in order)
  pub fn distribute(&self, archive: &PackageArchive, hosts: &[String]) -> ShipResult<DistributionReport> {
    let bundle = DeploymentBundle::for_archive(archive, self.config);
    let mut progress = if self.show_progress {
      HostProgress::new(hosts.len(), "Copying files")
    } else {
      HostProgress::hidden()
    };
    let printer = self.printer;
    let next = match self.policy {
      FailurePolicy::Abort => "stopping",
      FailurePolicy::Continue => "moving on",
    };

    printer.step(format!("🚚 Distributing {} to {} host(s)...", archive.file_name(), hosts.len()));
    let distributor = Distributor::new(self.runner, self.config, self.policy);
    distributor.distribute(&bundle, hosts, &mut |event| match event {
      HostEvent::Started { host, index, total } => {
        printer.step(format!("   [{}/{}] Copying the files to {}...", index + 1, total, host));
      }
      HostEvent::Finished(outcome) => {
        if let HostStatus::Failed { file, .. } = &outcome.status {
          printer.step(format!("   ⚠️  {} failed while sending {}; {}", outcome.host, file, next));
        }
        progress.inc();
      }
    })
  }

  /// Describe what `run` would do without doing it
  pub fn plan(&self) -> ShipResult<Plan> {
    let config = self.config;
    let version = metadata::read_version(&config.control_file())?;
    let mut plan = Plan::new(version.as_str()).with_summary(format!(
      "Build {} for {}/{}, package {}, ship to {} host(s) (on failure: {})",
      config.build.binary_name,
      config.build.target_os,
      config.build.target_arch,
      package::archive_file_name(&config.package.archive_name, &version),
      config.targets.len(),
      match self.policy {
        FailurePolicy::Abort => "abort",
        FailurePolicy::Continue => "continue",
      }
    ));

    for path in clean::stale_outputs(config)? {
      plan.add_operation(Operation::RemoveFile {
        path: path.display().to_string(),
      });
    }

    plan.add_operation(Operation::Invoke {
      stage: Stage::Build,
      command: build::build_invocation(config, &version).command_line(),
    });
    plan.add_operation(Operation::Move {
      from: config.built_artifact_path().display().to_string(),
      to: config.staged_binary_path().display().to_string(),
    });
    plan.add_operation(Operation::Invoke {
      stage: Stage::Package,
      command: package::package_invocation(config, &version).command_line(),
    });

    let bundle = DeploymentBundle::new(&package::archive_path(config, &version), config);
    for host in &config.targets {
      for file in &bundle.files {
        plan.add_operation(Operation::Transfer {
          host: host.clone(),
          file: file.kind,
          command: distribute::transfer_invocation(config, host, &file.path).command_line(),
        });
      }
    }

    Ok(plan)
  }
}
