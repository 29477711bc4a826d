//! Run only the workspace cleaner

use crate::core::context::ReleaseContext;
use crate::core::error::ShipResult;
use crate::pipeline::clean::clean_workspace;

pub fn run_clean(ctx: &ReleaseContext) -> ShipResult<()> {
  println!("🧹 Cleaning up previous outputs...");
  let report = clean_workspace(&ctx.config)?;

  if report.removed.is_empty() {
    println!("   Nothing to remove");
  } else {
    for path in &report.removed {
      println!("   Removed {}", path.display());
    }
  }

  println!("✅ Workspace clean");
  Ok(())
}
