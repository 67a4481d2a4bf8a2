//! BEST-AIR CLI
//!
//! Exit codes: 0 success, 1 unknown or malformed table, 2 resource or
//! configuration error.

use clap::Parser;

use best_air::cli::{run_cli, Args};

fn main() {
    let args = Args::parse();
    let exit_code = run_cli(args);
    std::process::exit(exit_code);
}
