//! Test helpers for integration tests
//!
//! `TestRelease` lays out a release workspace in a temp directory: agent
//! sources, a staging tree with a control record, the auxiliary files, and
//! fake `go`, `dpkg-deb` and `scp` scripts that append every call to a log.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A release workspace wired to fake external tools
pub struct TestRelease {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRelease {
  /// Workspace for `version`, shipping to `targets`
  pub fn new(version: &str, targets: &[&str]) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    fs::create_dir_all(path.join("agent-src"))?;
    fs::create_dir_all(path.join("build/usr/local/bin"))?;
    fs::create_dir_all(path.join("build/DEBIAN"))?;
    fs::create_dir_all(path.join("scripts"))?;
    fs::create_dir_all(path.join("tools"))?;

    fs::write(path.join("agent-src/main.go"), "package main\n")?;
    fs::write(path.join("scripts/sample_config.yaml"), "interval: 60\n")?;
    fs::write(path.join("scripts/filldisks.sh"), "#!/bin/sh\n")?;

    let release = Self { _root: root, path };
    release.set_version(version)?;
    release.install_tools(None)?;
    release.write_config(targets, "")?;
    Ok(release)
  }

  /// Rewrite the control record with `version`
  pub fn set_version(&self, version: &str) -> Result<()> {
    fs::write(
      self.path.join("build/DEBIAN/control"),
      format!(
        "Package: agent\nVersion: {}\nArchitecture: amd64\nMaintainer: Ops <ops@example.com>\nDescription: volume monitor\n",
        version
      ),
    )?;
    Ok(())
  }

  /// Write ship.toml; `extra` is appended verbatim
  pub fn write_config(&self, targets: &[&str], extra: &str) -> Result<()> {
    let targets = targets.iter().map(|t| format!("\"{}\"", t)).collect::<Vec<_>>().join(", ");
    let tools = self.path.join("tools");
    let config = format!(
      r#"source_dir = "agent-src"
staging_bin_dir = "build/usr/local/bin"
package_root = "build"
targets = [{targets}]

[[aux_files]]
kind = "sample-config"
path = "scripts/sample_config.yaml"

[[aux_files]]
kind = "helper-script"
path = "scripts/filldisks.sh"

[build]
compiler = "{go}"
verify_version = true

[package]
tool = "{dpkg}"

[distribute]
transport = "{scp}"
remote_dir = "~/agent"
{extra}"#,
      targets = targets,
      go = tools.join("go").display(),
      dpkg = tools.join("dpkg-deb").display(),
      scp = tools.join("scp").display(),
      extra = extra,
    );
    fs::write(self.path.join("ship.toml"), config)?;
    Ok(())
  }

  /// Install fake tools; transfers to `failing_host` exit non-zero
  pub fn install_tools(&self, failing_host: Option<&str>) -> Result<()> {
    let log = self.log_path();
    let log = log.display();

    // The built "binary" reports whatever version was stamped into it
    write_script(
      &self.path.join("tools/go"),
      &format!(
        r#"echo "go $* GOOS=$GOOS GOARCH=$GOARCH" >> "{log}"
version=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -ldflags) shift; version="${{1##*=}}" ;;
    -o) shift; out="$1" ;;
  esac
  shift
done
printf '#!/bin/sh\necho "%s"\n' "$version" > "$out"
chmod +x "$out"
"#
      ),
    )?;

    // The "archive" lists the files in the staging tree
    write_script(
      &self.path.join("tools/dpkg-deb"),
      &format!(
        r#"echo "dpkg-deb $*" >> "{log}"
(cd "$2" && find . -type f | sort) > "$3"
"#
      ),
    )?;

    let fail = match failing_host {
      Some(host) => format!(
        r#"case " $* " in
  *" {host}:"*) echo "ssh: connect to host {host} port 22: Connection refused" >&2; exit 1 ;;
esac
"#
      ),
      None => String::new(),
    };
    write_script(
      &self.path.join("tools/scp"),
      &format!(
        r#"{fail}echo "scp $*" >> "{log}"
"#
      ),
    )?;

    Ok(())
  }

  pub fn log_path(&self) -> PathBuf {
    self.path.join("calls.log")
  }

  /// Logged tool calls, oldest first
  pub fn calls(&self) -> Result<Vec<String>> {
    match fs::read_to_string(self.log_path()) {
      Ok(content) => Ok(content.lines().map(str::to_string).collect()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
      Err(e) => Err(e.into()),
    }
  }

  /// Logged transfers as (host, file name) pairs
  pub fn transfers(&self) -> Result<Vec<(String, String)>> {
    Ok(
      self
        .calls()?
        .iter()
        .filter_map(|line| line.strip_prefix("scp "))
        .filter_map(|rest| {
          let mut parts = rest.split_whitespace();
          let local = parts.next()?;
          let dest = parts.next()?;
          let host = dest.split(':').next()?.to_string();
          let file = Path::new(local).file_name()?.to_string_lossy().into_owned();
          Some((host, file))
        })
        .collect(),
    )
  }

  pub fn archive(&self, version: &str) -> PathBuf {
    self.path.join("dist").join(format!("agent_{}.deb", version))
  }

  pub fn staged_binary(&self) -> PathBuf {
    self.path.join("build/usr/local/bin/agent")
  }

  pub fn built_binary(&self) -> PathBuf {
    self.path.join("agent-src/agent")
  }
}

fn write_script(path: &Path, body: &str) -> Result<()> {
  use std::os::unix::fs::PermissionsExt;

  fs::write(path, format!("#!/bin/sh\n{}", body))?;
  let mut perms = fs::metadata(path)?.permissions();
  perms.set_mode(0o755);
  fs::set_permissions(path, perms)?;
  Ok(())
}

/// Run agent-ship and return its output whatever the exit status
pub fn run_ship(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_agent-ship");

  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run agent-ship")
}

/// Run agent-ship and fail unless it exits successfully
pub fn run_ship_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_ship(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "agent-ship command failed: agent-ship {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
