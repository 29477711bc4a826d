//! Release plans for reviewable dry-runs
//!
//! A plan lists, in order, every operation a release run would perform:
//! files removed, tools invoked, the binary moved, each transfer. It is built
//! from the same invocation builders the pipeline executes, so what a dry-run
//! shows is what a real run does.
//!
//! ```text
//! ship.toml + control record
//!   ↓
//! Plan (what to do)  ──▶  --dry-run / `plan`: print and stop
//!   ↓
//! Pipeline (do it)
//! ```

use crate::core::error::{FileKind, ShipResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Plan identifier (SHA256 hash of plan operations)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanId(String);

impl PlanId {
  /// Create a plan ID from plan contents
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let result = hasher.finalize();
    Self(format!("{:x}", result))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// Pipeline stage an operation belongs to
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Clean,
  Build,
  Relocate,
  Package,
  Distribute,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stage::Clean => write!(f, "clean"),
      Stage::Build => write!(f, "build"),
      Stage::Relocate => write!(f, "relocate"),
      Stage::Package => write!(f, "package"),
      Stage::Distribute => write!(f, "distribute"),
    }
  }
}

/// Operation a run performs
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
  /// Delete a stale output
  RemoveFile { path: String },

  /// Run an external tool
  Invoke { stage: Stage, command: String },

  /// Move a file
  Move { from: String, to: String },

  /// Copy one bundle file to one host
  Transfer {
    host: String,
    file: FileKind,
    command: String,
  },
}

impl Operation {
  pub fn stage(&self) -> Stage {
    match self {
      Operation::RemoveFile { .. } => Stage::Clean,
      Operation::Invoke { stage, .. } => *stage,
      Operation::Move { .. } => Stage::Relocate,
      Operation::Transfer { .. } => Stage::Distribute,
    }
  }
}

/// A plan represents a sequence of operations to perform
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
  pub id: PlanId,

  /// Version read from the control record
  pub version: String,

  /// Operations to perform (in order)
  pub operations: Vec<Operation>,

  /// Human-readable summary
  pub summary: String,
}

impl Plan {
  /// Create a new plan
  pub fn new(version: impl Into<String>) -> Self {
    Self {
      id: PlanId::from_contents(&[]),
      version: version.into(),
      operations: Vec::new(),
      summary: String::new(),
    }
  }

  /// Add an operation to the plan
  pub fn add_operation(&mut self, operation: Operation) {
    self.operations.push(operation);
    self.recompute_id();
  }

  /// Set the summary
  pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
    self.summary = summary.into();
    self
  }

  /// Recompute plan ID based on current contents
  fn recompute_id(&mut self) {
    let json = serde_json::to_vec(&self.operations).unwrap_or_default();
    self.id = PlanId::from_contents(&json);
  }

  /// Serialize to JSON
  pub fn to_json(&self) -> ShipResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Number of operations in `stage`
  pub fn count(&self, stage: Stage) -> usize {
    self.operations.iter().filter(|op| op.stage() == stage).count()
  }

  /// Get human-readable representation
  pub fn to_human_readable(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!("📋 Release plan {} (version {})\n", self.id, self.version));

    if !self.summary.is_empty() {
      output.push_str(&format!("\n{}\n", self.summary));
    }

    output.push_str(&format!("\n   Operations ({}):\n", self.operations.len()));

    for (i, op) in self.operations.iter().enumerate() {
      output.push_str(&format!("   {}. [{}] {}\n", i + 1, op.stage(), operation_to_string(op)));
    }

    output.push_str(&format!(
      "\n   {} stale file(s) to remove, {} transfer(s)\n",
      self.count(Stage::Clean),
      self.count(Stage::Distribute)
    ));

    output
  }
}

/// Convert operation to human-readable string
fn operation_to_string(op: &Operation) -> String {
  match op {
    Operation::RemoveFile { path } => format!("Remove {}", path),
    Operation::Invoke { command, .. } => format!("Run {}", command),
    Operation::Move { from, to } => format!("Move {} → {}", from, to),
    Operation::Transfer { host, file, command } => format!("Send {} to {}: {}", file, host, command),
  }
}
