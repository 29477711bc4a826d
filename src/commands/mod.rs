//! CLI commands for agent-ship
//!
//! - **run**: the whole release pipeline (`--dry-run` shows the plan)
//! - **plan**: print the release plan without executing
//! - **version**: print the version from the control record
//! - **clean**: remove outputs of a previous run
//! - **distribute**: re-send the existing archive to some or all hosts
//! - **doctor**: run health checks
//!
//! All commands except doctor take `&ReleaseContext` so configuration is
//! loaded once in main.

pub mod clean;
pub mod distribute;
pub mod doctor;
pub mod run;
pub mod version;

pub use clean::run_clean;
pub use distribute::run_distribute;
pub use doctor::run_doctor;
pub use run::{run_plan, run_release};
pub use version::run_version;
