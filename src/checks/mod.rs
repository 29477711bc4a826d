//! Health checks run by `agent-ship doctor`
//!
//! - **config**: ship.toml found and valid (built into the runner)
//! - **control-record**: release version readable
//! - **tools**: compiler, packaging tool and transport on PATH
//! - **ssh-keys**: SSH keys present with sane permissions (ssh-based transports)
//! - **host-reachability**: every target accepts a non-interactive login (thorough only)

mod check;
mod control;
mod hosts;
mod runner;
mod ssh;
mod tools;

pub use check::{CheckResult, Severity};
pub use runner::create_default_runner;
