//! Integration tests for `agent-ship doctor`

use crate::helpers::{TestRelease, run_ship};
use anyhow::Result;

#[test]
fn test_doctor_json_reports_checks() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A"])?;

  let output = run_ship(&release.path, &["doctor", "--json"])?;
  let results: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  let results = results.as_array().cloned().unwrap_or_default();

  let find = |name: &str| results.iter().find(|r| r["check_name"] == name).cloned();
  let config = find("config").expect("config check");
  assert_eq!(config["passed"], true);
  let control = find("control-record").expect("control-record check");
  assert_eq!(control["passed"], true);
  assert!(control["message"].as_str().unwrap_or_default().contains("agent_1.4.2.deb"));
  let tools = find("tools").expect("tools check");
  assert_eq!(tools["passed"], true);

  // Host reachability only runs with --thorough
  assert!(find("host-reachability").is_none());

  Ok(())
}

#[test]
fn test_doctor_without_config_fails_validation() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_ship(dir.path(), &["doctor"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert_eq!(output.status.code(), Some(3));
  assert!(stdout.contains("❌ config"));

  Ok(())
}
