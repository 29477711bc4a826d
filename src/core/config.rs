//! Release configuration (ship.toml) parsing and validation

use crate::core::error::{ConfigError, FileKind, ResultExt, ShipError, ShipResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the release version in `package.archive_name`
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Configuration for agent-ship
/// Searched in order: ship.toml, .ship.toml, .config/ship.toml
///
/// # Example
///
/// ```toml
/// source_dir = "agent"
/// staging_bin_dir = "build/usr/local/bin"
/// package_root = "build"
/// targets = ["serverA", "serverB"]
///
/// [[aux_files]]
/// kind = "sample-config"
/// path = "user-scripts/sample_config.yaml"
///
/// [[aux_files]]
/// kind = "helper-script"
/// path = "user-scripts/filldisks.sh"
///
/// [distribute]
/// remote_dir = "~/agent"
/// on_failure = "continue"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipConfig {
  /// Source workspace the compiler runs in
  #[serde(alias = "sourceDir")]
  pub source_dir: PathBuf,

  /// Directory inside the staging tree receiving the binary
  #[serde(alias = "stagingBinDir")]
  pub staging_bin_dir: PathBuf,

  /// Root of the staging tree handed to the packaging tool
  #[serde(alias = "packageRoot")]
  pub package_root: PathBuf,

  /// Auxiliary files shipped next to the package
  #[serde(default, alias = "auxFiles")]
  pub aux_files: Vec<AuxFile>,

  /// Ordered deployment targets
  #[serde(default)]
  pub targets: Vec<String>,

  #[serde(default)]
  pub build: BuildConfig,

  #[serde(default)]
  pub package: PackageConfig,

  #[serde(default)]
  pub distribute: DistributeConfig,
}

/// An auxiliary file of the deployment bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuxFile {
  pub kind: FileKind,
  pub path: PathBuf,
}

/// Cross-compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Compiler program (default: go)
  #[serde(default = "default_compiler")]
  pub compiler: String,

  /// Name of the produced executable
  #[serde(default = "default_binary_name")]
  pub binary_name: String,

  /// Target operating system (default: linux)
  #[serde(default = "default_target_os")]
  pub target_os: String,

  /// Target architecture (default: amd64)
  #[serde(default = "default_target_arch")]
  pub target_arch: String,

  /// Child environment variable carrying the target OS (default: GOOS)
  #[serde(default = "default_os_env")]
  pub os_env: String,

  /// Child environment variable carrying the target architecture (default: GOARCH)
  #[serde(default = "default_arch_env")]
  pub arch_env: String,

  /// Linker symbol receiving the version (default: main.version)
  #[serde(default = "default_version_symbol")]
  pub version_symbol: String,

  /// Run the built binary with `--version` and compare (only when it runs on this host)
  #[serde(default)]
  pub verify_version: bool,

  #[serde(default = "default_build_timeout")]
  pub timeout_secs: u64,
}

/// Packaging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
  /// Packaging program (default: dpkg-deb)
  #[serde(default = "default_package_tool")]
  pub tool: String,

  /// Control record (default: <package_root>/DEBIAN/control)
  #[serde(default)]
  pub control_file: Option<PathBuf>,

  /// Where the archive is written (default: dist)
  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,

  /// Archive file name; must contain `{version}`
  #[serde(default = "default_archive_name")]
  pub archive_name: String,

  #[serde(default = "default_package_timeout")]
  pub timeout_secs: u64,
}

/// Fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributeConfig {
  /// Transfer program (default: scp)
  #[serde(default = "default_transport")]
  pub transport: String,

  /// Extra arguments placed before the file operands (e.g. `-i`, `-o BatchMode=yes`)
  #[serde(default)]
  pub extra_args: Vec<String>,

  /// Remote directory on every host
  #[serde(default = "default_remote_dir")]
  pub remote_dir: String,

  /// What a failed transfer does to the remaining hosts
  #[serde(default)]
  pub on_failure: FailurePolicy,

  #[serde(default = "default_transfer_timeout")]
  pub timeout_secs: u64,
}

/// Continue-vs-abort choice for multi-host distribution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
  /// Stop the whole run at the first failed transfer
  #[default]
  Abort,
  /// Skip the failing host and keep shipping to the rest
  Continue,
}

fn default_compiler() -> String {
  "go".to_string()
}

fn default_binary_name() -> String {
  "agent".to_string()
}

fn default_target_os() -> String {
  "linux".to_string()
}

fn default_target_arch() -> String {
  "amd64".to_string()
}

fn default_os_env() -> String {
  "GOOS".to_string()
}

fn default_arch_env() -> String {
  "GOARCH".to_string()
}

fn default_version_symbol() -> String {
  "main.version".to_string()
}

fn default_build_timeout() -> u64 {
  600
}

fn default_package_tool() -> String {
  "dpkg-deb".to_string()
}

fn default_output_dir() -> PathBuf {
  PathBuf::from("dist")
}

fn default_archive_name() -> String {
  format!("agent_{}.deb", VERSION_PLACEHOLDER)
}

fn default_package_timeout() -> u64 {
  120
}

fn default_transport() -> String {
  "scp".to_string()
}

fn default_remote_dir() -> String {
  "~/agent".to_string()
}

fn default_transfer_timeout() -> u64 {
  300
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      compiler: default_compiler(),
      binary_name: default_binary_name(),
      target_os: default_target_os(),
      target_arch: default_target_arch(),
      os_env: default_os_env(),
      arch_env: default_arch_env(),
      version_symbol: default_version_symbol(),
      verify_version: false,
      timeout_secs: default_build_timeout(),
    }
  }
}

impl Default for PackageConfig {
  fn default() -> Self {
    Self {
      tool: default_package_tool(),
      control_file: None,
      output_dir: default_output_dir(),
      archive_name: default_archive_name(),
      timeout_secs: default_package_timeout(),
    }
  }
}

impl Default for DistributeConfig {
  fn default() -> Self {
    Self {
      transport: default_transport(),
      extra_args: Vec::new(),
      remote_dir: default_remote_dir(),
      on_failure: FailurePolicy::default(),
      timeout_secs: default_transfer_timeout(),
    }
  }
}

impl ShipConfig {
  /// Find config file in search order: ship.toml, .ship.toml, .config/ship.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("ship.toml"),
      path.join(".ship.toml"),
      path.join(".config").join("ship.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config by searching `search_root`
  pub fn load(search_root: &Path) -> ShipResult<(PathBuf, Self)> {
    let config_path = Self::find_config_path(search_root).ok_or_else(|| {
      ShipError::Config(ConfigError::NotFound {
        search_root: search_root.to_path_buf(),
      })
    })?;
    let config = Self::load_from(&config_path)?;
    Ok((config_path, config))
  }

  /// Load, resolve and validate an explicit config file
  pub fn load_from(config_path: &Path) -> ShipResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let mut config = Self::parse(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);
    config.validate()?;

    Ok(config)
  }

  /// Parse TOML without touching the filesystem
  pub fn parse(content: &str) -> ShipResult<Self> {
    Ok(toml_edit::de::from_str(content)?)
  }

  /// Make every relative path absolute against `base`
  pub fn resolve_paths(&mut self, base: &Path) {
    let resolve = |p: &mut PathBuf| {
      if p.is_relative() {
        *p = base.join(&*p);
      }
    };

    resolve(&mut self.source_dir);
    resolve(&mut self.staging_bin_dir);
    resolve(&mut self.package_root);
    resolve(&mut self.package.output_dir);
    if let Some(control) = self.package.control_file.as_mut() {
      resolve(control);
    }
    for aux in &mut self.aux_files {
      resolve(&mut aux.path);
    }
  }

  /// Validate once, before any stage runs
  pub fn validate(&self) -> ShipResult<()> {
    if self.targets.is_empty() {
      return Err(ConfigError::MissingField {
        field: "targets".to_string(),
      }
      .into());
    }

    let mut seen = HashSet::new();
    for host in &self.targets {
      if host.trim().is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid("targets", format!("'{}' is not a host name", host)));
      }
      if !seen.insert(host.as_str()) {
        return Err(invalid("targets", format!("'{}' is listed twice", host)));
      }
    }

    if !self.source_dir.is_dir() {
      return Err(
        ConfigError::PathMissing {
          field: "source_dir".to_string(),
          path: self.source_dir.clone(),
        }
        .into(),
      );
    }

    if !self.package_root.is_dir() {
      return Err(
        ConfigError::PathMissing {
          field: "package_root".to_string(),
          path: self.package_root.clone(),
        }
        .into(),
      );
    }

    if !self.staging_bin_dir.starts_with(&self.package_root) {
      return Err(invalid(
        "staging_bin_dir",
        format!(
          "{} is outside package_root {}",
          self.staging_bin_dir.display(),
          self.package_root.display()
        ),
      ));
    }

    if !self.staging_bin_dir.is_dir() {
      return Err(
        ConfigError::PathMissing {
          field: "staging_bin_dir".to_string(),
          path: self.staging_bin_dir.clone(),
        }
        .into(),
      );
    }

    self.validate_aux_files()?;

    if self.build.binary_name.is_empty() || self.build.binary_name.contains(['/', '\\']) {
      return Err(invalid("build.binary_name", "must be a plain file name"));
    }

    let archive = &self.package.archive_name;
    if !archive.contains(VERSION_PLACEHOLDER) {
      return Err(invalid(
        "package.archive_name",
        format!("must contain {} so each release gets its own archive", VERSION_PLACEHOLDER),
      ));
    }
    if archive.contains(['/', '\\']) {
      return Err(invalid("package.archive_name", "must be a plain file name"));
    }

    for (field, secs) in [
      ("build.timeout_secs", self.build.timeout_secs),
      ("package.timeout_secs", self.package.timeout_secs),
      ("distribute.timeout_secs", self.distribute.timeout_secs),
    ] {
      if secs == 0 {
        return Err(invalid(field, "must be greater than zero"));
      }
    }

    for (field, value) in [
      ("build.compiler", &self.build.compiler),
      ("package.tool", &self.package.tool),
      ("distribute.transport", &self.distribute.transport),
      ("distribute.remote_dir", &self.distribute.remote_dir),
    ] {
      if value.trim().is_empty() {
        return Err(
          ConfigError::MissingField {
            field: field.to_string(),
          }
          .into(),
        );
      }
    }

    Ok(())
  }

  fn validate_aux_files(&self) -> ShipResult<()> {
    let mut kinds = HashSet::new();
    for aux in &self.aux_files {
      if aux.kind == FileKind::Package {
        return Err(invalid("aux_files", "the package is shipped implicitly; use sample-config or helper-script"));
      }
      if !kinds.insert(aux.kind) {
        return Err(invalid("aux_files", format!("{} is listed twice", aux.kind)));
      }
      if !aux.path.is_file() {
        return Err(
          ConfigError::PathMissing {
            field: format!("aux_files ({})", aux.kind),
            path: aux.path.clone(),
          }
          .into(),
        );
      }
    }

    for required in [FileKind::SampleConfig, FileKind::HelperScript] {
      if !kinds.contains(&required) {
        return Err(
          ConfigError::MissingField {
            field: format!("aux_files entry of kind {}", required),
          }
          .into(),
        );
      }
    }

    Ok(())
  }

  /// Control record path
  pub fn control_file(&self) -> PathBuf {
    self
      .package
      .control_file
      .clone()
      .unwrap_or_else(|| self.package_root.join("DEBIAN").join("control"))
  }

  /// Where the compiler leaves the executable
  pub fn built_artifact_path(&self) -> PathBuf {
    self.source_dir.join(&self.build.binary_name)
  }

  /// Where the executable lives inside the staging tree
  pub fn staged_binary_path(&self) -> PathBuf {
    self.staging_bin_dir.join(&self.build.binary_name)
  }

  /// Auxiliary files in bundle order
  pub fn ordered_aux_files(&self) -> Vec<&AuxFile> {
    let mut files: Vec<&AuxFile> = self.aux_files.iter().collect();
    files.sort_by_key(|aux| aux.kind);
    files
  }

  /// Configured targets restricted to `only`, keeping configured order
  pub fn select_targets(&self, only: &[String]) -> ShipResult<Vec<String>> {
    if only.is_empty() {
      return Ok(self.targets.clone());
    }

    for host in only {
      if !self.targets.contains(host) {
        return Err(ConfigError::UnknownHost { host: host.clone() }.into());
      }
    }

    Ok(self.targets.iter().filter(|t| only.contains(t)).cloned().collect())
  }
}

fn invalid(field: &str, reason: impl Into<String>) -> ShipError {
  ShipError::Config(ConfigError::Invalid {
    field: field.to_string(),
    reason: reason.into(),
  })
}
