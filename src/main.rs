mod checks;
mod commands;
mod core;
mod pipeline;
mod ui;

use clap::{Parser, Subcommand};
use crate::core::context::ReleaseContext;
use crate::core::error::{ResultExt, ShipError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build, package and ship the monitoring agent to its hosts
#[derive(Parser)]
#[command(name = "agent-ship")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Path to ship.toml (default: search the current directory)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Clean, build, stage, package and distribute in one run
  Run {
    /// Show the release plan without executing anything
    #[arg(long)]
    dry_run: bool,
    /// Keep distributing to the remaining hosts when one fails
    #[arg(long)]
    keep_going: bool,
    /// Output the run report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the release plan without executing (same as `run --dry-run`)
  Plan {
    /// Output plan in JSON format (useful for CI/automation)
    #[arg(long)]
    json: bool,
  },

  /// Print the release version from the control record
  Version,

  /// Remove the built binary, the staged binary and old archives
  Clean,

  /// Re-send the existing archive for the current version
  Distribute {
    /// Only send to this host (repeatable; must be a configured target)
    #[arg(long = "host", value_name = "HOST")]
    hosts: Vec<String>,
    /// Keep distributing to the remaining hosts when one fails
    #[arg(long)]
    keep_going: bool,
    /// Output the distribution report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Run health checks and diagnostics
  Doctor {
    /// Run thorough checks (includes host connectivity)
    #[arg(long)]
    thorough: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  let yellow = anstyle::Color::Ansi(anstyle::AnsiColor::Yellow);
  let green = anstyle::Color::Ansi(anstyle::AnsiColor::Green);
  let red = anstyle::Color::Ansi(anstyle::AnsiColor::Red);

  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .header(anstyle::Style::new().bold().underline().fg_color(Some(yellow)))
    .literal(anstyle::Style::new().fg_color(Some(green)))
    .invalid(anstyle::Style::new().bold().fg_color(Some(red)))
    .error(anstyle::Style::new().bold().fg_color(Some(red)))
    .valid(anstyle::Style::new().bold().underline().fg_color(Some(green)))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let cwd = match std::env::current_dir().context("Failed to get current directory") {
    Ok(dir) => dir,
    Err(e) => handle_error(e),
  };

  // Configuration is loaded and validated once, before any stage runs
  let release = ReleaseContext::build(&cwd, cli.config.as_deref());

  let result = match cli.command {
    // Doctor reports a broken config instead of failing on it
    Commands::Doctor { thorough, json } => commands::run_doctor(release.map_err(|e| e.to_string()), thorough, json),
    Commands::Run {
      dry_run,
      keep_going,
      json,
    } => release.and_then(|ctx| commands::run_release(&ctx, dry_run, keep_going, json)),
    Commands::Plan { json } => release.and_then(|ctx| commands::run_plan(&ctx, false, json)),
    Commands::Version => release.and_then(|ctx| commands::run_version(&ctx)),
    Commands::Clean => release.and_then(|ctx| commands::run_clean(&ctx)),
    Commands::Distribute {
      hosts,
      keep_going,
      json,
    } => release.and_then(|ctx| commands::run_distribute(&ctx, &hosts, keep_going, json)),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ShipError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
