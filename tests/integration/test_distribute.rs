//! Integration tests for `agent-ship distribute`

use crate::helpers::{TestRelease, run_ship, run_ship_ok};
use anyhow::Result;
use std::fs;

#[test]
fn test_distribute_resends_existing_archive() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B", "C"])?;
  run_ship_ok(&release.path, &["run"])?;
  fs::remove_file(release.log_path())?;

  run_ship_ok(&release.path, &["distribute", "--host", "C", "--host", "A"])?;

  // No rebuild, and hosts keep their configured order
  let calls = release.calls()?;
  assert!(calls.iter().all(|c| c.starts_with("scp ")), "calls: {:?}", calls);
  let hosts: Vec<String> = release.transfers()?.into_iter().map(|(host, _)| host).collect();
  assert_eq!(hosts, vec!["A", "A", "A", "C", "C", "C"]);

  Ok(())
}

#[test]
fn test_distribute_unknown_host() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A"])?;
  run_ship_ok(&release.path, &["run"])?;

  let output = run_ship(&release.path, &["distribute", "--host", "Z"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("Host 'Z' is not a configured target"));

  Ok(())
}

#[test]
fn test_distribute_without_archive() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A"])?;

  let output = run_ship(&release.path, &["distribute"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert!(!output.status.success());
  assert!(stderr.contains("agent-ship run"), "stderr: {}", stderr);
  assert!(release.calls()?.is_empty());

  Ok(())
}

#[test]
fn test_distribute_json_with_failures() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B"])?;
  run_ship_ok(&release.path, &["run"])?;
  release.install_tools(Some("B"))?;

  let output = run_ship(&release.path, &["distribute", "--keep-going", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert!(!output.status.success());
  assert_eq!(report["policy"], "continue");
  assert_eq!(report["hosts"][0]["status"], "delivered");
  assert_eq!(report["hosts"][1]["status"], "failed");
  assert_eq!(report["hosts"][1]["file"], "package");

  Ok(())
}
