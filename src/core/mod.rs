//! Core engine for agent-ship
//!
//! - **config**: ship.toml parsing and validation
//! - **context**: Loaded-once release context shared by all commands
//! - **error**: Error types with contextual help messages and exit codes
//! - **exec**: External tool invocation with bounded timeouts
//! - **plan**: Serializable description of a release run (dry-run)

pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod plan;
