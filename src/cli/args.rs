//! CLI argument parsing
//!
//! ```text
//! best-air [options] <command>
//!
//! COMMANDS:
//!   list                      Table definitions and load state
//!   check                     Load every built-in table
//!   show <name> [--rows N]    Print the first rows of a table
//!   add <path> [--index-col C] [--skip-rows N] [--rows N]
//!   model                     Reference lists built from the tables
//! ```

use best_air_core::{IndexColumn, IndexSpec};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "best-air", version, about = "BEST-AIR reference tables")]
pub struct Args {
    /// TOML config file (default: ./best-air.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding tables/<name>.csv, overrides the config file
    #[arg(long, global = true)]
    pub tables_dir: Option<PathBuf>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// List table definitions and whether each is loaded
    List,

    /// Load every built-in table, failing on the first bad one
    Check,

    /// Print the first rows of a table
    Show {
        name: String,
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },

    /// Add an external CSV file under its base name and print it
    Add {
        path: PathBuf,
        /// Index column name or position; comma-separated for a composite key
        #[arg(long)]
        index_col: Option<String>,
        /// Lines to skip before the header
        #[arg(long, default_value_t = 0)]
        skip_rows: usize,
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },

    /// Print the reference lists used by the model
    Model,
}

/// Parse `--index-col`: `name`, `2`, or `Mode,Fuel`
pub fn parse_index_spec(spec: Option<&str>) -> IndexSpec {
    let Some(spec) = spec else {
        return IndexSpec::None;
    };
    let cols: Vec<IndexColumn> = spec
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(pos) => IndexColumn::Position(pos),
            Err(_) => IndexColumn::Name(s.to_string()),
        })
        .collect();
    if cols.is_empty() {
        IndexSpec::None
    } else {
        IndexSpec::Columns(cols)
    }
}
