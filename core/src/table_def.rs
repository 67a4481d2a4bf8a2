//! Table definitions
//!
//! Static metadata for the built-in tables. Adding a CSV file to `core/tables`
//! requires a matching entry in [`builtin_definitions`] and in the embedded
//! resource list (see [`crate::resources`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single index column, named or by zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexColumn {
    Name(String),
    Position(usize),
}

impl From<&str> for IndexColumn {
    fn from(name: &str) -> Self {
        IndexColumn::Name(name.to_string())
    }
}

impl From<usize> for IndexColumn {
    fn from(pos: usize) -> Self {
        IndexColumn::Position(pos)
    }
}

impl fmt::Display for IndexColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexColumn::Name(name) => write!(f, "{}", name),
            IndexColumn::Position(pos) => write!(f, "#{}", pos),
        }
    }
}

/// Which columns make up a table's row key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexSpec {
    /// Rows are keyed by position only
    #[default]
    None,
    /// One or more columns whose combined values are unique per row
    Columns(Vec<IndexColumn>),
}

impl IndexSpec {
    pub fn column(col: impl Into<IndexColumn>) -> Self {
        IndexSpec::Columns(vec![col.into()])
    }

    pub fn is_none(&self) -> bool {
        match self {
            IndexSpec::None => true,
            IndexSpec::Columns(cols) => cols.is_empty(),
        }
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSpec::None => write!(f, "-"),
            IndexSpec::Columns(cols) => {
                let names: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}

/// Value written into every missing cell at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

impl From<&str> for FillValue {
    fn from(s: &str) -> Self {
        FillValue::Text(s.to_string())
    }
}

impl From<f64> for FillValue {
    fn from(n: f64) -> Self {
        FillValue::Number(n)
    }
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillValue::Number(n) => write!(f, "{}", n),
            FillValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Metadata for one built-in table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Logical name, also the resource basename (`tables/<name>.csv`)
    pub name: String,
    pub index: IndexSpec,
    pub fill: Option<FillValue>,
    /// Second header line carries units
    pub has_units: bool,
    /// Columns read as text whatever their contents look like
    #[serde(default)]
    pub text_columns: Vec<String>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: IndexSpec::None,
            fill: None,
            has_units: false,
            text_columns: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.index = index;
        self
    }

    pub fn with_fill(mut self, fill: impl Into<FillValue>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_units(mut self) -> Self {
        self.has_units = true;
        self
    }

    /// Keep these columns as text, e.g. zero-padded codes
    pub fn with_text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Relative path of the backing resource
    pub fn resource_path(&self) -> String {
        format!("tables/{}.csv", self.name)
    }
}

/// The tables shipped with the crate, in load order
pub fn builtin_definitions() -> Vec<TableDefinition> {
    vec![
        TableDefinition::new("CAP").with_index(IndexSpec::column("name")),
        TableDefinition::new("TAC").with_index(IndexSpec::column("name")),
        TableDefinition::new("counties").with_text_columns(["fips"]),
        TableDefinition::new("air-basins"),
        TableDefinition::new("air-districts"),
        TableDefinition::new("source-sectors"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_path() {
        let def = TableDefinition::new("air-basins");
        assert_eq!(def.resource_path(), "tables/air-basins.csv");
    }

    #[test]
    fn test_builtin_names_unique() {
        let defs = builtin_definitions();
        let mut names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), defs.len());
    }

    #[test]
    fn test_index_spec_display() {
        let spec = IndexSpec::Columns(vec!["Mode".into(), IndexColumn::Position(2)]);
        assert_eq!(spec.to_string(), "Mode,#2");
        assert_eq!(IndexSpec::None.to_string(), "-");
        assert!(IndexSpec::Columns(vec![]).is_none());
    }

    #[test]
    fn test_counties_fips_is_text() {
        let defs = builtin_definitions();
        let counties = defs
            .iter()
            .find(|d| d.name == "counties")
            .expect("counties definition");
        assert_eq!(counties.text_columns, vec!["fips".to_string()]);
    }
}
