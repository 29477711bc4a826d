//! Host reachability check (thorough mode only)

use super::check::{Check, CheckResult};
use crate::core::context::ReleaseContext;
use crate::core::exec::{Invocation, SystemRunner, ToolRunner};
use std::time::Duration;

/// Every target accepts a non-interactive SSH login
pub struct HostReachabilityCheck<R: ToolRunner = SystemRunner> {
  runner: R,
}

impl HostReachabilityCheck {
  pub fn system() -> Self {
    Self { runner: SystemRunner }
  }
}

impl<R: ToolRunner> HostReachabilityCheck<R> {
  pub fn with_runner(runner: R) -> Self {
    Self { runner }
  }

  fn reachable(&self, host: &str) -> bool {
    match self.runner.run(&login_invocation(host)) {
      Ok(output) => output.success(),
      Err(e) => {
        tracing::debug!(host, error = %e, "could not start ssh");
        false
      }
    }
  }
}

/// Login that runs `true` and never prompts
pub fn login_invocation(host: &str) -> Invocation {
  Invocation::new("ssh")
    .args(["-o", "BatchMode=yes", "-o", "ConnectTimeout=5", host, "true"])
    .timeout(Duration::from_secs(15))
}

impl<R: ToolRunner> Check for HostReachabilityCheck<R> {
  fn name(&self) -> &'static str {
    "host-reachability"
  }

  fn description(&self) -> &'static str {
    "Logs into every target host over SSH without a prompt"
  }

  fn thorough_only(&self) -> bool {
    true
  }

  fn run(&self, release: &ReleaseContext) -> CheckResult {
    let targets = &release.config.targets;
    let unreachable: Vec<&str> = targets
      .iter()
      .map(String::as_str)
      .filter(|host| !self.reachable(host))
      .collect();

    if unreachable.is_empty() {
      CheckResult::pass(self.name(), format!("all {} host(s) reachable", targets.len()))
    } else {
      CheckResult::warn(self.name(), format!("unreachable: {}", unreachable.join(", ")))
        .with_fix("With on_failure = \"continue\" a release still reaches the other hosts")
    }
  }
}
