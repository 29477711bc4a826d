//! Terminal output: stage messages and progress bars

pub mod output;
pub mod progress;

pub use output::Printer;
pub use progress::HostProgress;
