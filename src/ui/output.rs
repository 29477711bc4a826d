//! User-facing progress messages
//!
//! Stage messages normally go to stdout. With `--json` stdout is reserved for
//! the machine-readable report, so messages move to stderr.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
  json: bool,
}

impl Printer {
  pub fn new(json: bool) -> Self {
    Self { json }
  }

  pub fn is_json(&self) -> bool {
    self.json
  }

  /// Print one line of progress
  pub fn step(&self, msg: impl Display) {
    if self.json {
      eprintln!("{}", msg);
    } else {
      println!("{}", msg);
    }
  }

  /// Print a blank separator line
  pub fn blank(&self) {
    self.step("");
  }
}
