//! Health check command for diagnosing issues
//!
//! The doctor command runs all health checks and reports any issues found.

use crate::checks::{CheckResult, Severity, create_default_runner};
use crate::core::context::ReleaseContext;
use crate::core::error::{ExitCode, ShipResult};

/// Run the doctor command
///
/// `release` carries the load error when ship.toml is missing or invalid, so
/// the config check can report it instead of the command failing outright.
pub fn run_doctor(release: Result<ReleaseContext, String>, thorough: bool, json: bool) -> ShipResult<()> {
  let runner = create_default_runner();
  let results = runner.run_all(&release, thorough);
  let has_errors = results.iter().any(CheckResult::is_error);

  if json {
    println!("{}", serde_json::to_string_pretty(&results)?);
    if has_errors {
      std::process::exit(ExitCode::Validation.as_i32());
    }
    return Ok(());
  }

  println!("🏥 Running health checks...\n");

  println!("📋 Registered checks:");
  for (name, description) in runner.describe() {
    println!("   • {}: {}", name, description);
  }
  println!();

  let mut has_warnings = false;
  for result in &results {
    let icon = if result.passed { "✅" } else { "❌" };
    println!("{} {}: {}", icon, result.check_name, result.message);

    if !result.passed {
      if let Some(ref suggestion) = result.suggestion {
        println!("   💡 Fix: {}", suggestion);
      }
      if result.severity == Severity::Warning {
        has_warnings = true;
      }
    }
    println!();
  }

  let passed_count = results.iter().filter(|r| r.passed).count();
  println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
  println!("Summary: {}/{} checks passed", passed_count, results.len());

  if has_errors {
    println!("\n⚠️  Critical issues found. Please fix errors before releasing.");
    std::process::exit(ExitCode::Validation.as_i32());
  } else if has_warnings {
    println!("\n⚠️  Some warnings found. Consider addressing them.");
  } else {
    println!("\n✨ All checks passed! Ready to release.");
  }

  Ok(())
}
