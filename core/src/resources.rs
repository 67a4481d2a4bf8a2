//! Resource access
//!
//! Tables are read through a [`ResourceSource`], addressed by a path relative
//! to the package (e.g. `tables/CAP.csv`). The built-in CSV files are compiled
//! into the crate; a directory on disk can shadow them.

use crate::error::{RegistryError, Result};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where table bytes come from
pub trait ResourceSource: Send + Sync + fmt::Debug {
    /// Read the resource at `relpath`
    fn read(&self, relpath: &str) -> Result<Vec<u8>>;

    /// Short description for log messages
    fn describe(&self) -> String;
}

const EMBEDDED: &[(&str, &str)] = &[
    ("tables/CAP.csv", include_str!("../tables/CAP.csv")),
    ("tables/TAC.csv", include_str!("../tables/TAC.csv")),
    ("tables/counties.csv", include_str!("../tables/counties.csv")),
    ("tables/air-basins.csv", include_str!("../tables/air-basins.csv")),
    (
        "tables/air-districts.csv",
        include_str!("../tables/air-districts.csv"),
    ),
    (
        "tables/source-sectors.csv",
        include_str!("../tables/source-sectors.csv"),
    ),
];

/// The CSV files bundled with the crate
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    pub fn paths() -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(path, _)| *path)
    }
}

impl ResourceSource for EmbeddedResources {
    fn read(&self, relpath: &str) -> Result<Vec<u8>> {
        EMBEDDED
            .iter()
            .find(|(path, _)| *path == relpath)
            .map(|(_, text)| text.as_bytes().to_vec())
            .ok_or_else(|| {
                RegistryError::access(
                    relpath,
                    io::Error::new(io::ErrorKind::NotFound, "no bundled resource"),
                )
            })
    }

    fn describe(&self) -> String {
        "embedded".to_string()
    }
}

/// Resources under a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceSource for DirectoryResources {
    fn read(&self, relpath: &str) -> Result<Vec<u8>> {
        let path = self.root.join(relpath);
        debug!("Reading resource {}", path.display());
        std::fs::read(&path).map_err(|e| RegistryError::access(path, e))
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }
}

/// A directory whose files shadow the embedded copies
///
/// Only a missing file falls through to the embedded set; any other I/O
/// failure is reported as is.
#[derive(Debug, Clone)]
pub struct OverlayResources {
    dir: DirectoryResources,
    fallback: EmbeddedResources,
}

impl OverlayResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            dir: DirectoryResources::new(root),
            fallback: EmbeddedResources,
        }
    }
}

impl ResourceSource for OverlayResources {
    fn read(&self, relpath: &str) -> Result<Vec<u8>> {
        match self.dir.read(relpath) {
            Err(RegistryError::ResourceAccess { source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                warn!(
                    "{} not found under {}, using bundled copy",
                    relpath,
                    self.dir.root().display()
                );
                self.fallback.read(relpath)
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("{}+embedded", self.dir.describe())
    }
}

/// Resources held in memory, keyed by relative path
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table's CSV text under `tables/<name>.csv`
    pub fn with_table(mut self, name: &str, csv: &str) -> Self {
        self.insert(&format!("tables/{}.csv", name), csv.as_bytes().to_vec());
        self
    }

    pub fn insert(&mut self, relpath: &str, bytes: Vec<u8>) {
        self.files.insert(relpath.to_string(), bytes);
    }
}

impl ResourceSource for MemoryResources {
    fn read(&self, relpath: &str) -> Result<Vec<u8>> {
        self.files.get(relpath).cloned().ok_or_else(|| {
            RegistryError::access(
                relpath,
                io::Error::new(io::ErrorKind::NotFound, "no such resource"),
            )
        })
    }

    fn describe(&self) -> String {
        format!("memory({} files)", self.files.len())
    }
}
