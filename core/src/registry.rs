//! Table Registry
//!
//! Resolves logical table names to loaded [`Table`]s. Each built-in table is
//! read from its resource the first time it is asked for and then cached for
//! the life of the registry.
//!
//! Every name owns a slot whose lock is held while that table loads, so
//! concurrent first requests for one name perform a single read and all
//! receive the same `Arc<Table>`. Loads of different names don't block each
//! other. A failed load leaves the slot empty. Once filled, a slot is read
//! without taking its lock.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::resources::{DirectoryResources, EmbeddedResources, OverlayResources, ResourceSource};
use crate::table::{LoadOptions, Table};
use crate::table_def::{builtin_definitions, IndexSpec, TableDefinition};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, info};

/// Cache cell for one table name
#[derive(Debug, Default)]
struct TableSlot {
    table: OnceLock<Arc<Table>>,
    /// Held for the duration of a load
    loading: Mutex<()>,
}

impl TableSlot {
    fn filled(table: Arc<Table>) -> Self {
        Self {
            table: OnceLock::from(table),
            loading: Mutex::new(()),
        }
    }

    fn get(&self) -> Option<Arc<Table>> {
        self.table.get().map(Arc::clone)
    }

    fn is_filled(&self) -> bool {
        self.table.get().is_some()
    }
}

type Slot = Arc<TableSlot>;

/// Registry of built-in and user-added tables
#[derive(Debug)]
pub struct TableRegistry {
    definitions: Vec<TableDefinition>,
    by_name: HashMap<String, usize>,
    source: Arc<dyn ResourceSource>,
    tables: DashMap<String, Slot>,
    loads: AtomicUsize,
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new(EmbeddedResources)
    }
}

impl TableRegistry {
    /// Registry over the built-in definitions
    pub fn new(source: impl ResourceSource + 'static) -> Self {
        Self::build(builtin_definitions(), Arc::new(source))
    }

    /// Registry over a custom definition set
    pub fn with_definitions(
        definitions: Vec<TableDefinition>,
        source: impl ResourceSource + 'static,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.name.as_str()) {
                return Err(RegistryError::Config(format!(
                    "table '{}' defined twice",
                    def.name
                )));
            }
        }
        Ok(Self::build(definitions, Arc::new(source)))
    }

    /// Registry configured from settings, preloading if asked
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let source: Arc<dyn ResourceSource> = match &config.tables_dir {
            Some(dir) if config.fallback_to_bundled => Arc::new(OverlayResources::new(dir)),
            Some(dir) => Arc::new(DirectoryResources::new(dir)),
            None => Arc::new(EmbeddedResources),
        };
        let registry = Self::build(builtin_definitions(), source);
        if config.preload {
            registry.load_all()?;
        }
        Ok(registry)
    }

    fn build(definitions: Vec<TableDefinition>, source: Arc<dyn ResourceSource>) -> Self {
        let by_name = definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();
        debug!(
            "Created table registry with {} definitions ({})",
            definitions.len(),
            source.describe()
        );
        Self {
            definitions,
            by_name,
            source,
            tables: DashMap::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Definitions in load order
    pub fn definitions(&self) -> &[TableDefinition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&TableDefinition> {
        self.by_name.get(name).map(|&i| &self.definitions[i])
    }

    /// Get a table, loading it on first use
    ///
    /// # Errors
    /// * `UnknownTable` - no definition and nothing added under `name`
    /// * `ResourceAccess` - the backing resource couldn't be read
    /// * `FileFormat` - the resource isn't a valid table
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        self.try_get_table(name)?
            .ok_or_else(|| RegistryError::UnknownTable(name.to_string()))
    }

    /// Like [`get_table`](Self::get_table), but an unknown name yields `Ok(None)`
    pub fn try_get_table(&self, name: &str) -> Result<Option<Arc<Table>>> {
        let Some(slot) = self.slot(name) else {
            return Ok(None);
        };

        if let Some(table) = slot.get() {
            debug!("Table '{}' served from cache", name);
            return Ok(Some(table));
        }

        let _guard = slot.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = slot.get() {
            debug!("Table '{}' loaded by another caller", name);
            return Ok(Some(table));
        }

        let Some(def) = self.definition(name) else {
            return Ok(None);
        };
        let table = Arc::new(self.load(def)?);
        Ok(Some(Arc::clone(slot.table.get_or_init(|| table))))
    }

    /// Existing slot for `name`, or a new empty one if `name` is defined
    fn slot(&self, name: &str) -> Option<Slot> {
        if let Some(slot) = self.tables.get(name).map(|s| Arc::clone(s.value())) {
            return Some(slot);
        }
        if !self.by_name.contains_key(name) {
            return None;
        }
        Some(Arc::clone(
            self.tables.entry(name.to_string()).or_default().value(),
        ))
    }

    fn load(&self, def: &TableDefinition) -> Result<Table> {
        let relpath = def.resource_path();
        self.loads.fetch_add(1, Ordering::SeqCst);
        let bytes = self.source.read(&relpath)?;
        let table = Table::from_csv_bytes(&def.name, bytes, &LoadOptions::from(def))?;
        info!(
            "Loaded table '{}' from {} ({} rows)",
            def.name,
            relpath,
            table.height()
        );
        Ok(table)
    }

    /// Read an external CSV and register it under the file's stem
    ///
    /// Replaces any table already cached under that name, built-in or not.
    pub fn add_table(
        &self,
        pathname: &Path,
        index: IndexSpec,
        skip_rows: usize,
    ) -> Result<Arc<Table>> {
        let name = pathname
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RegistryError::format(pathname.display().to_string(), "path has no file name")
            })?;

        let bytes = std::fs::read(pathname).map_err(|e| RegistryError::access(pathname, e))?;
        let opts = LoadOptions {
            index,
            skip_rows,
            ..Default::default()
        };
        let table = Arc::new(Table::from_csv_bytes(&name, bytes, &opts)?);

        let replaced = self
            .tables
            .insert(name.clone(), Arc::new(TableSlot::filled(Arc::clone(&table))))
            .is_some();
        info!(
            "Added table '{}' from {}{}",
            name,
            pathname.display(),
            if replaced { " (replaced)" } else { "" }
        );
        Ok(table)
    }

    /// Load every defined table in definition order, stopping at the first failure
    pub fn load_all(&self) -> Result<()> {
        for def in &self.definitions {
            self.get_table(&def.name)?;
        }
        info!("Loaded all {} tables", self.definitions.len());
        Ok(())
    }

    /// Whether `name` is cached, without loading it
    pub fn is_loaded(&self, name: &str) -> bool {
        let slot = self.tables.get(name).map(|s| Arc::clone(s.value()));
        slot.map_or(false, |s| s.is_filled())
    }

    /// Names of cached tables, sorted
    pub fn loaded_names(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = self
            .tables
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        let mut names: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| slot.is_filled())
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }

    /// Number of resource reads performed so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
