//! Full release run and its dry-run plan

use crate::core::config::FailurePolicy;
use crate::core::context::ReleaseContext;
use crate::core::error::ShipResult;
use crate::core::exec::SystemRunner;
use crate::pipeline::Pipeline;
use crate::pipeline::distribute::{DistributionReport, HostStatus};
use crate::ui::Printer;

/// Policy from config, unless `--keep-going` forces continue
pub(crate) fn effective_policy(ctx: &ReleaseContext, keep_going: bool) -> FailurePolicy {
  if keep_going {
    FailurePolicy::Continue
  } else {
    ctx.config.distribute.on_failure
  }
}

/// Run the whole pipeline (or just show the plan with `--dry-run`)
pub fn run_release(ctx: &ReleaseContext, dry_run: bool, keep_going: bool, json: bool) -> ShipResult<()> {
  if dry_run {
    return run_plan(ctx, keep_going, json);
  }

  let printer = Printer::new(json);
  let runner = SystemRunner;
  let pipeline = Pipeline::new(&ctx.config, &runner, printer).with_policy(effective_policy(ctx, keep_going));

  let report = pipeline.run()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    printer.blank();
    print_distribution_summary(printer, &report.distribution);
    if report.distribution.failed_hosts().is_empty() {
      let elapsed = report.finished_at - report.started_at;
      printer.step(format!(
        "✅ Released {} to {} host(s) in {}s",
        report.version,
        report.distribution.delivered(),
        elapsed.num_seconds()
      ));
    }
  }

  report.distribution.ensure_complete()
}

/// Print the release plan without executing anything
pub fn run_plan(ctx: &ReleaseContext, keep_going: bool, json: bool) -> ShipResult<()> {
  let runner = SystemRunner;
  let pipeline = Pipeline::new(&ctx.config, &runner, Printer::new(json)).with_policy(effective_policy(ctx, keep_going));
  let plan = pipeline.plan()?;

  if json {
    println!("{}", plan.to_json()?);
  } else {
    println!("{}", plan.to_human_readable());
    println!("💡 Nothing was executed. Run `agent-ship run` to release.");
  }

  Ok(())
}

/// Per-host result table printed at the end of a distribution pass
pub(crate) fn print_distribution_summary(printer: Printer, report: &DistributionReport) {
  printer.step("📊 Distribution summary:");
  for outcome in &report.hosts {
    match &outcome.status {
      HostStatus::Delivered => {
        printer.step(format!("   ✅ {} ({} file(s))", outcome.host, outcome.transfers));
      }
      HostStatus::Failed { file, reason } => {
        printer.step(format!("   ❌ {}: {} not delivered", outcome.host, file));
        if let Some(line) = reason.lines().find(|l| !l.trim().is_empty()) {
          printer.step(format!("      {}", line.trim()));
        }
      }
    }
  }
  printer.step(format!(
    "   {}/{} host(s) delivered, {} transfer(s)",
    report.delivered(),
    report.hosts.len(),
    report.transfers()
  ));
}
