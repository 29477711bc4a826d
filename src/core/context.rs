//! Release context - load once, pass everywhere
//!
//! Built in main.rs from the located ship.toml and passed by reference to
//! every command, so configuration is read and validated exactly once.

use crate::core::config::ShipConfig;
use crate::core::error::ShipResult;
use std::path::{Path, PathBuf};

/// Shared state for one invocation of agent-ship
#[derive(Debug, Clone)]
pub struct ReleaseContext {
  /// Config file that was loaded
  pub config_path: PathBuf,

  /// Directory relative paths were resolved against
  pub root: PathBuf,

  /// Validated configuration
  pub config: ShipConfig,
}

impl ReleaseContext {
  /// Load from an explicit config file, or search `cwd`
  pub fn build(cwd: &Path, explicit: Option<&Path>) -> ShipResult<Self> {
    let (config_path, config) = match explicit {
      Some(path) => {
        let path = if path.is_relative() { cwd.join(path) } else { path.to_path_buf() };
        let config = ShipConfig::load_from(&path)?;
        (path, config)
      }
      None => ShipConfig::load(cwd)?,
    };

    let root = config_path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
    tracing::debug!(config = %config_path.display(), targets = config.targets.len(), "loaded configuration");

    Ok(Self {
      config_path,
      root,
      config,
    })
  }
}
