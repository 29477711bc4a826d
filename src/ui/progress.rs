//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars on stderr. Bars are only
//! drawn when stderr is a terminal so logs and CI output stay clean.

use linya::{Bar, Progress};
use std::io::IsTerminal;

/// Progress bar advancing once per target host
pub struct HostProgress {
  inner: Option<(Progress, Bar)>,
}

impl HostProgress {
  /// Create a new progress bar over `total` hosts
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    if !std::io::stderr().is_terminal() {
      return Self::hidden();
    }
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Some((progress, bar)),
    }
  }

  /// A bar that never draws
  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    if let Some((progress, bar)) = self.inner.as_mut() {
      progress.inc_and_draw(bar, 1);
    }
  }
}
