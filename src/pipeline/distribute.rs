//! Distributor: fan the deployment bundle out to every target host
//!
//! Hosts are served strictly in configured order, one at a time, and each
//! host receives its files in bundle order (package, sample config, helper
//! script). What a failed transfer does to the remaining hosts is decided by
//! the configured [`FailurePolicy`].

use crate::core::config::{FailurePolicy, ShipConfig};
use crate::core::error::{FileKind, ShipResult, StageError};
use crate::core::exec::{Invocation, ToolRunner};
use crate::pipeline::package::PackageArchive;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The files delivered to each host, in transfer order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentBundle {
  pub files: Vec<BundleFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleFile {
  pub kind: FileKind,
  pub path: PathBuf,
}

impl DeploymentBundle {
  /// Package first, then auxiliary files by kind
  pub fn new(archive: &Path, config: &ShipConfig) -> Self {
    let mut files = vec![BundleFile {
      kind: FileKind::Package,
      path: archive.to_path_buf(),
    }];
    files.extend(config.ordered_aux_files().into_iter().map(|aux| BundleFile {
      kind: aux.kind,
      path: aux.path.clone(),
    }));
    Self { files }
  }

  pub fn for_archive(archive: &PackageArchive, config: &ShipConfig) -> Self {
    Self::new(&archive.path, config)
  }
}

/// Transport call copying `local` to `host`
pub fn transfer_invocation(config: &ShipConfig, host: &str, local: &Path) -> Invocation {
  let dist = &config.distribute;
  Invocation::new(&dist.transport)
    .args(dist.extra_args.iter().map(String::as_str))
    .arg(local.to_string_lossy())
    .arg(format!("{}:{}", host, dist.remote_dir))
    .timeout(Duration::from_secs(dist.timeout_secs))
}

/// How one host fared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostStatus {
  Delivered,
  Failed { file: FileKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostOutcome {
  pub host: String,
  #[serde(flatten)]
  pub status: HostStatus,
  /// Transfers attempted for this host
  pub transfers: usize,
}

impl HostOutcome {
  pub fn is_delivered(&self) -> bool {
    matches!(self.status, HostStatus::Delivered)
  }
}

/// Summary of a distribution pass
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
  pub policy: FailurePolicy,
  pub hosts: Vec<HostOutcome>,
}

impl DistributionReport {
  pub fn delivered(&self) -> usize {
    self.hosts.iter().filter(|h| h.is_delivered()).count()
  }

  pub fn failed_hosts(&self) -> Vec<String> {
    self
      .hosts
      .iter()
      .filter(|h| !h.is_delivered())
      .map(|h| h.host.clone())
      .collect()
  }

  pub fn transfers(&self) -> usize {
    self.hosts.iter().map(|h| h.transfers).sum()
  }

  /// Turn a best-effort pass with failures into an error
  pub fn ensure_complete(&self) -> ShipResult<()> {
    let failed = self.failed_hosts();
    if failed.is_empty() {
      return Ok(());
    }
    Err(
      StageError::DistributionIncomplete {
        failed,
        delivered: self.delivered(),
      }
      .into(),
    )
  }
}

/// Progress notifications, one pair per host
#[derive(Debug)]
pub enum HostEvent<'a> {
  Started { host: &'a str, index: usize, total: usize },
  Finished(&'a HostOutcome),
}

/// Sequential multi-host fan-out
pub struct Distributor<'a> {
  runner: &'a dyn ToolRunner,
  config: &'a ShipConfig,
  policy: FailurePolicy,
}

impl<'a> Distributor<'a> {
  pub fn new(runner: &'a dyn ToolRunner, config: &'a ShipConfig, policy: FailurePolicy) -> Self {
    Self { runner, config, policy }
  }

  /// Ship `bundle` to `hosts` in order
  ///
  /// Under [`FailurePolicy::Abort`] the first failed transfer ends the pass
  /// with `TransferFailed` and later hosts are never contacted. Under
  /// [`FailurePolicy::Continue`] the failing host's remaining files are
  /// skipped and the pass goes on; check the report with
  /// [`DistributionReport::ensure_complete`].
  pub fn distribute(
    &self,
    bundle: &DeploymentBundle,
    hosts: &[String],
    on_event: &mut dyn FnMut(HostEvent<'_>),
  ) -> ShipResult<DistributionReport> {
    let mut report = DistributionReport {
      policy: self.policy,
      hosts: Vec::with_capacity(hosts.len()),
    };

    for (index, host) in hosts.iter().enumerate() {
      on_event(HostEvent::Started {
        host,
        index,
        total: hosts.len(),
      });

      let outcome = match self.ship_to_host(bundle, host) {
        Ok(transfers) => HostOutcome {
          host: host.clone(),
          status: HostStatus::Delivered,
          transfers,
        },
        Err((transfers, error)) => {
          tracing::warn!(host = %host, error = %error, "transfer failed");
          let StageError::TransferFailed { file, failure, .. } = &error else {
            return Err(error.into());
          };
          let outcome = HostOutcome {
            host: host.clone(),
            status: HostStatus::Failed {
              file: file.clone(),
              reason: failure.to_string(),
            },
            transfers,
          };
          if self.policy == FailurePolicy::Abort {
            on_event(HostEvent::Finished(&outcome));
            return Err(error.into());
          }
          outcome
        }
      };

      on_event(HostEvent::Finished(&outcome));
      report.hosts.push(outcome);
    }

    Ok(report)
  }

  /// Send every bundle file to one host; stops at that host's first failure
  fn ship_to_host(&self, bundle: &DeploymentBundle, host: &str) -> Result<usize, (usize, StageError)> {
    let mut attempted = 0;
    for file in &bundle.files {
      attempted += 1;
      let invocation = transfer_invocation(self.config, host, &file.path);
      tracing::debug!(host, file = %file.kind, "transferring");

      let failure = match self.runner.run(&invocation) {
        Ok(output) if output.success() => continue,
        Ok(output) => invocation.failure(&output),
        Err(e) => invocation.spawn_failure(&e),
      };

      return Err((
        attempted,
        StageError::TransferFailed {
          host: host.to_string(),
          file: file.kind,
          failure,
        },
      ));
    }
    Ok(attempted)
  }
}
