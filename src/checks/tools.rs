//! External tool availability check

use super::check::{Check, CheckResult};
use crate::core::context::ReleaseContext;
use std::env;
use std::path::{Path, PathBuf};

pub struct ToolsCheck;

impl Check for ToolsCheck {
  fn name(&self) -> &'static str {
    "tools"
  }

  fn description(&self) -> &'static str {
    "Locates the compiler, packaging tool and transport"
  }

  fn run(&self, release: &ReleaseContext) -> CheckResult {
    let config = &release.config;
    let tools = [
      ("compiler", &config.build.compiler),
      ("packager", &config.package.tool),
      ("transport", &config.distribute.transport),
    ];

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for (role, program) in tools {
      match find_program(program) {
        Some(path) => found.push(format!("{} → {}", role, path.display())),
        None => missing.push(format!("{} ({})", program, role)),
      }
    }

    if missing.is_empty() {
      CheckResult::pass(self.name(), found.join(", "))
    } else {
      CheckResult::fail(self.name(), format!("not found on PATH: {}", missing.join(", ")))
        .with_fix("Install the tool or set its full path in ship.toml")
    }
  }
}

/// Resolve a program the way a spawn would: paths as-is, bare names via PATH
pub fn find_program(program: &str) -> Option<PathBuf> {
  let candidate = Path::new(program);
  if candidate.components().count() > 1 {
    return candidate.is_file().then(|| candidate.to_path_buf());
  }

  let path = env::var_os("PATH")?;
  env::split_paths(&path)
    .map(|dir| dir.join(program))
    .find(|p| p.is_file())
}
