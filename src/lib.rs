//! BEST-AIR: command-line access to the reference tables
//!
//! The table registry and model live in `best-air-core`; this crate adds the
//! CLI on top.

pub mod cli;

pub use best_air_core::{Model, Table, TableRegistry};
