//! Control record check: a release version can be read

use super::check::{Check, CheckResult};
use crate::core::context::ReleaseContext;
use crate::pipeline::metadata::read_version;
use crate::pipeline::package::archive_file_name;

pub struct ControlRecordCheck;

impl Check for ControlRecordCheck {
  fn name(&self) -> &'static str {
    "control-record"
  }

  fn description(&self) -> &'static str {
    "Reads the release version from the control record"
  }

  fn run(&self, release: &ReleaseContext) -> CheckResult {
    let config = &release.config;
    match read_version(&config.control_file()) {
      Ok(version) => CheckResult::pass(
        self.name(),
        format!(
          "version {} (archive {})",
          version,
          archive_file_name(&config.package.archive_name, &version)
        ),
      ),
      Err(err) => {
        CheckResult::fail(self.name(), err.to_string()).with_fix("Add a `Version: x.y.z` line to the control record")
      }
    }
  }
}
