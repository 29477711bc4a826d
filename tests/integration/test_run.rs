//! Integration tests for `agent-ship run`

use crate::helpers::{TestRelease, run_ship, run_ship_ok};
use anyhow::Result;
use std::fs;

#[test]
fn test_run_end_to_end() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B"])?;

  let output = run_ship_ok(&release.path, &["run"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  // Stages announce themselves in order
  let build = stdout.find("Building").expect("build message");
  let package = stdout.find("Building the package").expect("package message");
  let distribute = stdout.find("Distributing").expect("distribute message");
  assert!(build < package && package < distribute);
  assert!(stdout.contains("Released 1.4.2"));

  // Compiler got the cross-target on its own environment
  let calls = release.calls()?;
  assert!(calls[0].starts_with("go build -ldflags -X main.version=1.4.2 -o agent"));
  assert!(calls[0].ends_with("GOOS=linux GOARCH=amd64"));
  assert!(calls[1].starts_with("dpkg-deb --build"));

  // Staged binary reports the stamped version and made it into the archive
  let staged = release.staged_binary();
  assert!(staged.exists());
  assert!(!release.built_binary().exists());
  let reported = std::process::Command::new(&staged).arg("--version").output()?;
  assert_eq!(String::from_utf8_lossy(&reported.stdout).trim(), "1.4.2");

  let archive = release.archive("1.4.2");
  let listing = fs::read_to_string(&archive)?;
  assert!(listing.contains("./usr/local/bin/agent"));
  assert!(listing.contains("./DEBIAN/control"));

  // All three files reach A before anything reaches B
  let expected: Vec<(String, String)> = ["A", "B"]
    .iter()
    .flat_map(|host| {
      ["agent_1.4.2.deb", "sample_config.yaml", "filldisks.sh"]
        .iter()
        .map(move |file| (host.to_string(), file.to_string()))
    })
    .collect();
  assert_eq!(release.transfers()?, expected);

  Ok(())
}

#[test]
fn test_run_removes_previous_outputs() -> Result<()> {
  let release = TestRelease::new("1.4.1", &["A"])?;
  run_ship_ok(&release.path, &["run"])?;
  assert!(release.archive("1.4.1").exists());

  release.set_version("1.4.2")?;
  let output = run_ship_ok(&release.path, &["run"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("agent_1.4.1.deb"), "old archive should be reported removed");
  assert!(!release.archive("1.4.1").exists());
  assert!(release.archive("1.4.2").exists());

  Ok(())
}

#[test]
fn test_run_aborts_on_first_failed_transfer() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B"])?;
  release.install_tools(Some("A"))?;

  let output = run_ship(&release.path, &["run"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr.contains("Transfer of package to A failed"), "stderr: {}", stderr);
  assert!(stderr.contains("Connection refused"));
  assert!(release.transfers()?.is_empty(), "nothing may reach B after A fails");

  Ok(())
}

#[test]
fn test_run_keep_going_reaches_remaining_hosts() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B"])?;
  release.install_tools(Some("A"))?;

  let output = run_ship(&release.path, &["run", "--keep-going"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(2));
  assert!(stdout.contains("Distribution summary"));
  assert!(stdout.contains("A: package not delivered"));
  assert!(stderr.contains("Distribution incomplete"));

  let hosts: Vec<String> = release.transfers()?.into_iter().map(|(host, _)| host).collect();
  assert_eq!(hosts, vec!["B", "B", "B"]);

  Ok(())
}

#[test]
fn test_run_continue_policy_from_config() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A", "B"])?;
  release.write_config(&["A", "B"], "on_failure = \"continue\"\n")?;
  release.install_tools(Some("A"))?;

  let output = run_ship(&release.path, &["run"])?;

  assert!(!output.status.success());
  assert_eq!(release.transfers()?.len(), 3);

  Ok(())
}

#[test]
fn test_run_without_version_runs_no_tools() -> Result<()> {
  let release = TestRelease::new("1.4.2", &["A"])?;
  fs::write(release.path.join("build/DEBIAN/control"), "Package: agent\n")?;

  let output = run_ship(&release.path, &["run"])?;
  let stderr = String::from_utf8_lossy(&output.stderr);

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr.contains("Version not found"));
  assert!(release.calls()?.is_empty());

  Ok(())
}

#[test]
fn test_run_json_report() -> Result<()> {
  let release = TestRelease::new("2.0.0", &["A", "B"])?;

  let output = run_ship_ok(&release.path, &["run", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(report["version"], "2.0.0");
  assert_eq!(report["distribution"]["hosts"].as_array().map(Vec::len), Some(2));
  assert_eq!(report["distribution"]["hosts"][0]["status"], "delivered");
  assert_eq!(report["archive"]["sha256"].as_str().map(str::len), Some(64));

  Ok(())
}
