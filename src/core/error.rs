//! Error types for agent-ship with contextual messages and exit codes
//!
//! Every pipeline stage has its own failure kind so the operator can tell at a
//! glance which step of the release broke. Failures of external tools carry
//! the tool's captured diagnostic output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for agent-ship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, missing control record, invalid args)
  User = 1,
  /// System error (external tool failed, I/O, transfer)
  System = 2,
  /// Validation failure (doctor checks failed)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Which file of a deployment bundle a transfer carried
///
/// Declaration order is the transfer order within one host's bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
  Package,
  SampleConfig,
  HelperScript,
}

impl fmt::Display for FileKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FileKind::Package => write!(f, "package"),
      FileKind::SampleConfig => write!(f, "sample-config"),
      FileKind::HelperScript => write!(f, "helper-script"),
    }
  }
}

/// Captured result of an external tool that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
  /// Rendered command line
  pub command: String,
  /// Exit code, if the process exited normally
  pub status: Option<i32>,
  /// Combined diagnostic output (stderr, then stdout)
  pub output: String,
}

impl fmt::Display for ToolFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.status {
      Some(code) => write!(f, "`{}` exited with status {}", self.command, code)?,
      None => write!(f, "`{}` did not exit normally", self.command)?,
    }
    let output = self.output.trim();
    if !output.is_empty() {
      write!(f, "\n{}", output)?;
    }
    Ok(())
  }
}

/// Main error type for agent-ship
#[derive(Debug)]
pub enum ShipError {
  /// Configuration errors
  Config(ConfigError),

  /// A pipeline stage failed
  Stage(StageError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ShipError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ShipError::Message { message, context, help } => ShipError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ShipError::Io(err) => ShipError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ShipError::Config(_) => ExitCode::User,
      ShipError::Stage(StageError::VersionNotFound { .. }) => ExitCode::User,
      ShipError::Stage(_) => ExitCode::System,
      ShipError::Io(_) => ExitCode::System,
      ShipError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ShipError::Config(e) => e.help_message(),
      ShipError::Stage(e) => e.help_message(),
      ShipError::Message { help, .. } => help.clone(),
      ShipError::Io(_) => None,
    }
  }
}

impl fmt::Display for ShipError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShipError::Config(e) => write!(f, "{}", e),
      ShipError::Stage(e) => write!(f, "{}", e),
      ShipError::Io(e) => write!(f, "I/O error: {}", e),
      ShipError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ShipError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ShipError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ShipError {
  fn from(err: io::Error) -> Self {
    ShipError::Io(err)
  }
}

impl From<String> for ShipError {
  fn from(msg: String) -> Self {
    ShipError::message(msg)
  }
}

impl From<&str> for ShipError {
  fn from(msg: &str) -> Self {
    ShipError::message(msg)
  }
}

impl From<ConfigError> for ShipError {
  fn from(err: ConfigError) -> Self {
    ShipError::Config(err)
  }
}

impl From<StageError> for ShipError {
  fn from(err: StageError) -> Self {
    ShipError::Stage(err)
  }
}

impl From<toml_edit::de::Error> for ShipError {
  fn from(err: toml_edit::de::Error) -> Self {
    ShipError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for ShipError {
  fn from(err: serde_json::Error) -> Self {
    ShipError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// ship.toml not found
  NotFound { search_root: PathBuf },

  /// Missing or empty required field
  MissingField { field: String },

  /// A configured path does not exist
  PathMissing { field: String, path: PathBuf },

  /// Field present but its value is unusable
  Invalid { field: String, reason: String },

  /// Host requested on the command line is not in `targets`
  UnknownHost { host: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a ship.toml in the release directory or pass --config <path>.".to_string())
      }
      ConfigError::PathMissing { field, .. } => Some(format!(
        "Check `{}` in ship.toml; relative paths resolve against the config file's directory.",
        field
      )),
      ConfigError::UnknownHost { .. } => Some("Only hosts listed in `targets` can be shipped to.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No agent-ship configuration found.\nSearched in: {} (ship.toml, .ship.toml, .config/ship.toml)",
          search_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::PathMissing { field, path } => {
        write!(f, "Configured path for `{}` does not exist: {}", field, path.display())
      }
      ConfigError::Invalid { field, reason } => {
        write!(f, "Invalid value for `{}`: {}", field, reason)
      }
      ConfigError::UnknownHost { host } => {
        write!(f, "Host '{}' is not a configured target", host)
      }
    }
  }
}

/// Pipeline stage failures
#[derive(Debug)]
pub enum StageError {
  /// The control record has no usable `Version` line
  VersionNotFound { path: PathBuf, reason: String },

  /// The compiler failed or produced nothing
  BuildFailed(ToolFailure),

  /// The built binary reports a different version than was stamped
  VersionMismatch { expected: String, reported: String },

  /// The artifact could not be moved into the staging tree
  RelocateFailed { from: PathBuf, to: PathBuf, reason: String },

  /// The packaging tool failed or produced nothing
  PackageFailed(ToolFailure),

  /// A single file transfer to a host failed
  TransferFailed {
    host: String,
    file: FileKind,
    failure: ToolFailure,
  },

  /// Best-effort distribution finished with failed hosts
  DistributionIncomplete { failed: Vec<String>, delivered: usize },
}

impl StageError {
  fn help_message(&self) -> Option<String> {
    match self {
      StageError::VersionNotFound { .. } => {
        Some("The control record needs a line like `Version: 1.4.2`.".to_string())
      }
      StageError::BuildFailed(_) => Some("Fix the compile error above and re-run; nothing was packaged.".to_string()),
      StageError::VersionMismatch { .. } => Some(
        "Check `build.version_symbol` in ship.toml matches the variable the agent prints for --version.".to_string(),
      ),
      StageError::RelocateFailed { .. } => {
        Some("Make sure `staging_bin_dir` exists inside the staging tree.".to_string())
      }
      StageError::PackageFailed(_) => {
        Some("Inspect the staging tree (control record, permissions) and re-run.".to_string())
      }
      StageError::TransferFailed { failure, .. } => {
        let output = failure.output.to_lowercase();
        if output.contains("permission denied") || output.contains("host key") {
          Some("Check SSH keys and known_hosts for this host. Run `agent-ship doctor`.".to_string())
        } else if failure.status.is_none() {
          Some("The transfer timed out; check connectivity or raise `distribute.timeout_secs`.".to_string())
        } else {
          Some("Fix the host and re-send with `agent-ship distribute --host <host>`.".to_string())
        }
      }
      StageError::DistributionIncomplete { failed, .. } => Some(format!(
        "Re-send to the failed hosts with `agent-ship distribute{}`.",
        failed.iter().map(|h| format!(" --host {}", h)).collect::<String>()
      )),
    }
  }
}

impl fmt::Display for StageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageError::VersionNotFound { path, reason } => {
        write!(f, "Version not found in {}: {}", path.display(), reason)
      }
      StageError::BuildFailed(failure) => write!(f, "Build failed: {}", failure),
      StageError::VersionMismatch { expected, reported } => {
        write!(
          f,
          "Built binary reports version '{}' but '{}' was stamped",
          reported, expected
        )
      }
      StageError::RelocateFailed { from, to, reason } => {
        write!(f, "Failed to move {} → {}: {}", from.display(), to.display(), reason)
      }
      StageError::PackageFailed(failure) => write!(f, "Packaging failed: {}", failure),
      StageError::TransferFailed { host, file, failure } => {
        write!(f, "Transfer of {} to {} failed: {}", file, host, failure)
      }
      StageError::DistributionIncomplete { failed, delivered } => {
        write!(
          f,
          "Distribution incomplete: {} host(s) failed ({}), {} delivered",
          failed.len(),
          failed.join(", "),
          delivered
        )
      }
    }
  }
}

/// Result type alias for agent-ship
pub type ShipResult<T> = Result<T, ShipError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ShipResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ShipError>,
{
  fn context(self, ctx: impl Into<String>) -> ShipResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ShipError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
