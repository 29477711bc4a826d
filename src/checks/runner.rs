//! Runs the registered checks in order

use super::check::{Check, CheckResult};
use super::control::ControlRecordCheck;
use super::hosts::HostReachabilityCheck;
use super::ssh::SshKeyCheck;
use super::tools::ToolsCheck;
use crate::core::context::ReleaseContext;

/// Name of the built-in check every other check depends on
pub const CONFIG_CHECK: &str = "config";
const CONFIG_DESCRIPTION: &str = "Finds and validates ship.toml";

pub struct CheckRunner {
  checks: Vec<Box<dyn Check>>,
}

impl CheckRunner {
  pub fn new() -> Self {
    Self { checks: Vec::new() }
  }

  pub fn add_check(&mut self, check: impl Check + 'static) {
    self.checks.push(Box::new(check));
  }

  /// (name, description) of every check, config first
  pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
    std::iter::once((CONFIG_CHECK, CONFIG_DESCRIPTION))
      .chain(self.checks.iter().map(|c| (c.name(), c.description())))
      .collect()
  }

  /// Report on the configuration, then run the other checks if it loaded
  ///
  /// `release` carries the load error as text when ship.toml is missing or invalid.
  pub fn run_all(&self, release: &Result<ReleaseContext, String>, thorough: bool) -> Vec<CheckResult> {
    let release = match release {
      Ok(release) => release,
      Err(reason) => {
        return vec![
          CheckResult::fail(CONFIG_CHECK, reason.clone())
            .with_fix("Fix ship.toml; the other checks need a valid configuration"),
        ];
      }
    };

    let mut results = vec![CheckResult::pass(
      CONFIG_CHECK,
      format!(
        "{} is valid ({} target host(s), paths relative to {})",
        release.config_path.display(),
        release.config.targets.len(),
        release.root.display()
      ),
    )];

    for check in &self.checks {
      if check.thorough_only() && !thorough {
        tracing::debug!(check = check.name(), "skipped (thorough only)");
        continue;
      }
      results.push(check.run(release));
    }

    results
  }
}

impl Default for CheckRunner {
  fn default() -> Self {
    Self::new()
  }
}

/// Runner with every built-in check
pub fn create_default_runner() -> CheckRunner {
  let mut runner = CheckRunner::new();
  runner.add_check(ControlRecordCheck);
  runner.add_check(ToolsCheck);
  runner.add_check(SshKeyCheck::from_env());
  runner.add_check(HostReachabilityCheck::system());
  runner
}
