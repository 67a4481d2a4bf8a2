//! BEST-AIR Core
//!
//! Reference tables for the BEST-AIR air-quality tools: a lazily populated
//! registry mapping logical table names (`"CAP"`, `"counties"`, …) to tables
//! parsed from bundled CSV files, and the model built on top of it.
//!
//! ```ignore
//! use best_air_core::TableRegistry;
//!
//! let registry = TableRegistry::default();
//! let caps = registry.get_table("CAP")?;
//! println!("{} pollutants", caps.height());
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod registry;
pub mod resources;
pub mod table;
pub mod table_def;

pub use config::{AppConfig, LoggingConfig, ModelConfig, RegistryConfig};
pub use error::{RegistryError, Result};
pub use model::Model;
pub use registry::TableRegistry;
pub use resources::{
    DirectoryResources, EmbeddedResources, MemoryResources, OverlayResources, ResourceSource,
};
pub use table::{LoadOptions, Table};
pub use table_def::{builtin_definitions, FillValue, IndexColumn, IndexSpec, TableDefinition};
