//! Integration tests for `version`, `clean`, `plan` and `run --dry-run`

use crate::helpers::{TestRelease, run_ship, run_ship_ok};
use anyhow::Result;
use std::fs;

#[test]
fn test_version_prints_control_version() -> Result<()> {
  let release = TestRelease::new("3.1.0-rc1", &["A"])?;

  let output = run_ship_ok(&release.path, &["version"])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3.1.0-rc1");

  Ok(())
}

#[test]
fn test_explicit_config_path() -> Result<()> {
  let release = TestRelease::new("1.0.0", &["A"])?;
  fs::rename(release.path.join("ship.toml"), release.path.join("release.toml"))?;
  let elsewhere = tempfile::TempDir::new()?;
  let config = release.path.join("release.toml");

  let output = run_ship_ok(elsewhere.path(), &["--config", config.to_str().unwrap_or_default(), "version"])?;
  assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1.0.0");

  Ok(())
}

#[test]
fn test_missing_config() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_ship(dir.path(), &["version"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("No agent-ship configuration found"));

  Ok(())
}

#[test]
fn test_clean_is_idempotent() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A"])?;
  run_ship_ok(&release.path, &["run"])?;
  assert!(release.staged_binary().exists());

  let output = run_ship_ok(&release.path, &["clean"])?;
  assert!(String::from_utf8_lossy(&output.stdout).contains("Removed"));
  assert!(!release.staged_binary().exists());
  assert!(!release.archive("1.4.2").exists());

  let output = run_ship_ok(&release.path, &["clean"])?;
  assert!(String::from_utf8_lossy(&output.stdout).contains("Nothing to remove"));

  Ok(())
}

#[test]
fn test_plan_executes_nothing() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B"])?;

  let output = run_ship_ok(&release.path, &["plan", "--json"])?;
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(plan["version"], "1.4.2");
  let operations = plan["operations"].as_array().cloned().unwrap_or_default();
  let transfers = operations.iter().filter(|op| op["type"] == "transfer").count();
  assert_eq!(transfers, 6);
  assert!(release.calls()?.is_empty());

  Ok(())
}

#[test]
fn test_dry_run_matches_plan() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A"])?;

  let plan = run_ship_ok(&release.path, &["plan"])?;
  let dry_run = run_ship_ok(&release.path, &["run", "--dry-run"])?;

  assert_eq!(plan.stdout, dry_run.stdout);
  assert!(String::from_utf8_lossy(&plan.stdout).contains("Nothing was executed"));
  assert!(release.calls()?.is_empty());
  assert!(!release.archive("1.4.2").exists());

  Ok(())
}
