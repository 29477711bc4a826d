//! What a doctor check is and what it reports

use crate::core::context::ReleaseContext;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Info,
  Warning,
  Error,
}

/// Outcome of one check, printed by `doctor` or emitted as JSON
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
  pub check_name: String,
  pub passed: bool,
  pub severity: Severity,
  pub message: String,
  /// How to fix a failed check
  pub suggestion: Option<String>,
}

impl CheckResult {
  fn new(check: &str, passed: bool, severity: Severity, message: impl Into<String>) -> Self {
    Self {
      check_name: check.to_string(),
      passed,
      severity,
      message: message.into(),
      suggestion: None,
    }
  }

  pub fn pass(check: &str, message: impl Into<String>) -> Self {
    Self::new(check, true, Severity::Info, message)
  }

  /// Failed, but a release can still go ahead
  pub fn warn(check: &str, message: impl Into<String>) -> Self {
    Self::new(check, false, Severity::Warning, message)
  }

  /// Failed, and a release would fail too
  pub fn fail(check: &str, message: impl Into<String>) -> Self {
    Self::new(check, false, Severity::Error, message)
  }

  pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
    self.suggestion = Some(fix.into());
    self
  }

  pub fn is_error(&self) -> bool {
    !self.passed && self.severity == Severity::Error
  }
}

/// A check against a loaded, validated configuration
pub trait Check {
  /// Kebab-case name shown in reports
  fn name(&self) -> &'static str;

  fn description(&self) -> &'static str;

  /// Only run with `doctor --thorough` (touches the network)
  fn thorough_only(&self) -> bool {
    false
  }

  fn run(&self, release: &ReleaseContext) -> CheckResult;
}
