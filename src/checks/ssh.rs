//! SSH key check for ssh-based transports

use super::check::{Check, CheckResult};
use crate::core::context::ReleaseContext;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Transports that authenticate with SSH keys
const SSH_TRANSPORTS: &[&str] = &["scp", "rsync", "sftp"];

const DEFAULT_KEYS: &[&str] = &["id_ed25519", "id_rsa", "id_ecdsa"];

/// Default keys under `~/.ssh` exist and are private to the user
pub struct SshKeyCheck {
  home: Option<PathBuf>,
}

impl SshKeyCheck {
  pub fn from_env() -> Self {
    Self::with_home(std::env::var_os("HOME").map(PathBuf::from))
  }

  pub fn with_home(home: Option<PathBuf>) -> Self {
    Self { home }
  }
}

impl Check for SshKeyCheck {
  fn name(&self) -> &'static str {
    "ssh-keys"
  }

  fn description(&self) -> &'static str {
    "Validates SSH key existence and permissions"
  }

  fn run(&self, release: &ReleaseContext) -> CheckResult {
    let transport = Path::new(&release.config.distribute.transport)
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    if !SSH_TRANSPORTS.contains(&transport.as_str()) {
      return CheckResult::pass(
        self.name(),
        format!("transport '{}' does not use SSH keys; skipped", transport),
      );
    }

    let Some(home) = &self.home else {
      return CheckResult::fail(self.name(), "HOME environment variable not set")
        .with_fix("Ensure your shell environment is configured correctly");
    };

    let ssh_dir = home.join(".ssh");
    if !ssh_dir.is_dir() {
      return CheckResult::warn(self.name(), format!("SSH directory not found: {}", ssh_dir.display()))
        .with_fix("Create a key with: ssh-keygen -t ed25519, then install it on every target host");
    }

    let found: Vec<&str> = DEFAULT_KEYS
      .iter()
      .copied()
      .filter(|key| ssh_dir.join(key).is_file())
      .collect();
    if found.is_empty() {
      return CheckResult::warn(
        self.name(),
        "No default SSH keys found (an agent or ssh config may still provide one)",
      )
      .with_fix("Create a key with: ssh-keygen -t ed25519");
    }

    let loose = loose_permissions(&ssh_dir, &found);
    if !loose.is_empty() {
      return CheckResult::warn(
        self.name(),
        format!("SSH key permission issues:\n{}", loose.join("\n")),
      )
      .with_fix("Fix with: chmod 600 ~/.ssh/id_*");
    }

    CheckResult::pass(self.name(), format!("SSH keys found: {}", found.join(", ")))
  }
}

/// Keys readable by anyone but the owner (ssh refuses to use them)
#[cfg(unix)]
fn loose_permissions(ssh_dir: &Path, keys: &[&str]) -> Vec<String> {
  keys
    .iter()
    .filter_map(|key| {
      let mode = std::fs::metadata(ssh_dir.join(key)).ok()?.permissions().mode() & 0o777;
      (mode != 0o600 && mode != 0o400).then(|| format!("{}: has mode {:o} (should be 600 or 400)", key, mode))
    })
    .collect()
}

#[cfg(not(unix))]
fn loose_permissions(_ssh_dir: &Path, _keys: &[&str]) -> Vec<String> {
  Vec::new()
}
