//! nas-monitor library
//!
//! Command-line handling and the monitor loop behind the `nas-monitor`
//! binary. The binary itself is in main.rs.

pub mod cli;
pub mod monitor;

// Re-export commonly used types
pub use cli::{load_config, CliArgs};
pub use monitor::run;
