//! Re-send an already-built archive without rebuilding

use super::run::{effective_policy, print_distribution_summary};
use crate::core::context::ReleaseContext;
use crate::core::error::{ShipError, ShipResult};
use crate::core::exec::SystemRunner;
use crate::pipeline::Pipeline;
use crate::pipeline::package::{PackageArchive, archive_path};
use crate::ui::Printer;

/// Ship the current version's archive to all targets, or only `hosts`
pub fn run_distribute(ctx: &ReleaseContext, hosts: &[String], keep_going: bool, json: bool) -> ShipResult<()> {
  let config = &ctx.config;
  let printer = Printer::new(json);
  let runner = SystemRunner;
  let pipeline = Pipeline::new(config, &runner, printer).with_policy(effective_policy(ctx, keep_going));

  let targets = config.select_targets(hosts)?;
  let version = pipeline.read_version()?;
  let path = archive_path(config, &version);
  let archive = PackageArchive::open(&path, &version).map_err(|e| {
    ShipError::with_help(
      e.to_string(),
      "Run `agent-ship run` first to build the archive for this version",
    )
  })?;

  let report = pipeline.distribute(&archive, &targets)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    printer.blank();
    print_distribution_summary(printer, &report);
  }

  report.ensure_complete()
}
