//! Reference-data model
//!
//! Collects the lists that selection widgets are populated from: pollutant
//! names, regions, source sectors and the analysis years.

use crate::config::ModelConfig;
use crate::error::{RegistryError, Result};
use crate::registry::TableRegistry;
use crate::table::Table;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::debug;

/// type -> category -> sorted sector names
pub type SectorTree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, Serialize)]
pub struct Model {
    #[serde(skip)]
    caps: Arc<Table>,
    #[serde(skip)]
    tacs: Arc<Table>,
    pub cap_names: Vec<String>,
    pub tac_names: Vec<String>,
    pub counties: Vec<String>,
    pub air_basins: Vec<String>,
    pub air_districts: Vec<String>,
    /// Sector types in file order
    pub source_sector_types: Vec<String>,
    pub source_sectors: SectorTree,
    pub first_year: i32,
    pub last_year: i32,
    pub default_discount_rate: f64,
}

impl Model {
    pub fn new(registry: &TableRegistry, config: &ModelConfig) -> Result<Self> {
        config.validate()?;

        let caps = registry.get_table("CAP")?;
        let tacs = registry.get_table("TAC")?;

        let mut cap_names = caps.index_values();
        cap_names.sort();
        let mut tac_names = tacs.index_values();
        tac_names.sort();

        let counties = registry.get_table("counties")?.column_strings("name")?;
        let air_basins = registry.get_table("air-basins")?.column_strings("name")?;
        let air_districts = registry.get_table("air-districts")?.column_strings("name")?;

        let sectors = registry.get_table("source-sectors")?;
        let (source_sector_types, source_sectors) = sector_tree(&sectors)?;

        debug!(
            "Model: {} CAPs, {} TACs, {} counties, {} sector types",
            cap_names.len(),
            tac_names.len(),
            counties.len(),
            source_sector_types.len()
        );

        Ok(Self {
            caps,
            tacs,
            cap_names,
            tac_names,
            counties,
            air_basins,
            air_districts,
            source_sector_types,
            source_sectors,
            first_year: config.start_year,
            last_year: config.end_year,
            default_discount_rate: config.discount_rate,
        })
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    pub fn caps(&self) -> &Table {
        &self.caps
    }

    pub fn tacs(&self) -> &Table {
        &self.tacs
    }

    /// A TAC attribute, empty when the cell is blank
    pub fn tac_attribute(&self, tac: &str, column: &str) -> Option<String> {
        self.tacs.position(tac)?;
        Some(self.tacs.lookup(tac, column).unwrap_or_default())
    }

    /// Sector names across all categories of one type, sorted
    pub fn sectors_of_type(&self, sector_type: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .source_sectors
            .get(sector_type)
            .map(|cats| cats.values().flatten().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

fn sector_tree(table: &Table) -> Result<(Vec<String>, SectorTree)> {
    let types = table.column_values("type")?;
    let categories = table.column_values("category")?;
    let names = table.column_values("name")?;

    let mut order = Vec::new();
    let mut tree = SectorTree::new();
    for (row, ((t, c), n)) in types.into_iter().zip(categories).zip(names).enumerate() {
        let (Some(t), Some(c), Some(n)) = (t, c, n) else {
            return Err(RegistryError::format(
                table.name(),
                format!("incomplete sector at row {}", row),
            ));
        };
        if !tree.contains_key(&t) {
            order.push(t.clone());
        }
        tree.entry(t).or_default().entry(c).or_default().push(n);
    }

    for names in tree.values_mut().flat_map(|cats| cats.values_mut()) {
        names.sort();
    }
    Ok((order, tree))
}
