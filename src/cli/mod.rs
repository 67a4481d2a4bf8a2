//! CLI module
//!
//! Provides:
//! - Argument parsing (clap derive)
//! - Config loading with `--config` / `--tables-dir` overrides
//! - Command dispatch over a [`best_air_core::TableRegistry`]

pub mod args;
pub mod dispatch;

// Re-exports
pub use args::{parse_index_spec, Args, Command};
pub use dispatch::{exit_code_for, load_config, run_cli, run_command};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
/// Unknown table or malformed table data
pub const EXIT_TABLE_ERROR: i32 = 1;
/// Unreadable resource or bad configuration
pub const EXIT_CONFIG_ERROR: i32 = 2;
