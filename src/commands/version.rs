//! Print the release version from the control record

use crate::core::context::ReleaseContext;
use crate::core::error::ShipResult;
use crate::pipeline::metadata::read_version;

pub fn run_version(ctx: &ReleaseContext) -> ShipResult<()> {
  let version = read_version(&ctx.config.control_file())?;
  println!("{}", version);
  Ok(())
}
