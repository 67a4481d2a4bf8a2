//! Loaded tables
//!
//! A [`Table`] wraps a polars [`DataFrame`] parsed from CSV, together with the
//! resolved row key and any per-column units. Tables are immutable once built
//! and are shared as `Arc<Table>` by the registry.

use crate::error::{RegistryError, Result};
use crate::table_def::{FillValue, IndexColumn, IndexSpec, TableDefinition};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Separator between the parts of a composite key
pub const KEY_SEPARATOR: &str = "|";

/// Unit marker for unitless columns in a units row
const UNITLESS: &str = "_";

/// How to turn CSV bytes into a [`Table`]
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub index: IndexSpec,
    pub fill: Option<FillValue>,
    pub has_units: bool,
    /// Lines to drop before the header
    pub skip_rows: usize,
    /// Columns kept as text instead of inferred
    pub text_columns: Vec<String>,
}

impl From<&TableDefinition> for LoadOptions {
    fn from(def: &TableDefinition) -> Self {
        Self {
            index: def.index.clone(),
            fill: def.fill.clone(),
            has_units: def.has_units,
            skip_rows: 0,
            text_columns: def.text_columns.clone(),
        }
    }
}

/// An immutable in-memory table
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    frame: DataFrame,
    index_columns: Vec<String>,
    /// Rendered row keys; empty when the table has no index
    keys: Vec<String>,
    /// Row of each key, by its separate parts
    key_positions: HashMap<Vec<String>, usize>,
    /// Row of each rendered key; the first row wins when two keys render alike
    joined_positions: HashMap<String, usize>,
    units: HashMap<String, String>,
}

impl Table {
    /// Parse CSV bytes according to `opts`
    ///
    /// Fails with [`RegistryError::FileFormat`] when the CSV can't be parsed,
    /// an index column is absent, or the index has missing or repeated values.
    pub fn from_csv_bytes(name: &str, bytes: Vec<u8>, opts: &LoadOptions) -> Result<Self> {
        let units = if opts.has_units {
            read_units(name, &bytes, opts.skip_rows)?
        } else {
            HashMap::new()
        };

        let text_schema = text_schema(name, &bytes, opts)?;

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(opts.skip_rows)
            .with_skip_rows_after_header(usize::from(opts.has_units))
            .with_infer_schema_length(None)
            .with_schema_overwrite(text_schema)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| RegistryError::format(name, e))?;

        let index_columns = resolve_index(name, &frame, &opts.index)?;
        let key_parts = key_parts(name, &frame, &index_columns)?;

        let mut keys = Vec::with_capacity(key_parts.len());
        let mut key_positions = HashMap::with_capacity(key_parts.len());
        let mut joined_positions = HashMap::with_capacity(key_parts.len());
        for (pos, parts) in key_parts.into_iter().enumerate() {
            let key = parts.join(KEY_SEPARATOR);
            if key_positions.insert(parts, pos).is_some() {
                return Err(RegistryError::format(
                    name,
                    format!("duplicate index value '{}'", key),
                ));
            }
            joined_positions.entry(key.clone()).or_insert(pos);
            keys.push(key);
        }

        let frame = match &opts.fill {
            Some(fill) => fill_missing(name, frame, fill)?,
            None => frame,
        };

        debug!(
            "Parsed table '{}': {} rows x {} columns",
            name,
            frame.height(),
            frame.width()
        );

        Ok(Self {
            name: name.to_string(),
            frame,
            index_columns,
            keys,
            key_positions,
            joined_positions,
            units,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    pub fn has_index(&self) -> bool {
        !self.index_columns.is_empty()
    }

    /// Row keys in row order; row numbers when there is no index
    pub fn index_values(&self) -> Vec<String> {
        if self.has_index() {
            self.keys.clone()
        } else {
            (0..self.height()).map(|i| i.to_string()).collect()
        }
    }

    /// Position of the row with the given key
    ///
    /// Composite keys are written with [`KEY_SEPARATOR`] between parts. Use
    /// [`Table::position_of`] when a part may itself contain the separator.
    pub fn position(&self, key: &str) -> Option<usize> {
        if self.has_index() {
            self.joined_positions.get(key).copied()
        } else {
            key.parse::<usize>().ok().filter(|&i| i < self.height())
        }
    }

    /// Position of the row whose index columns hold exactly `parts`
    pub fn position_of(&self, parts: &[&str]) -> Option<usize> {
        let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        self.key_positions.get(&parts).copied()
    }

    /// Rendered value of one cell, `None` if the row, column or value is missing
    pub fn lookup(&self, key: &str, column: &str) -> Option<String> {
        let pos = self.position(key)?;
        let series = self.frame.column(column).ok()?;
        match series.get(pos).ok()? {
            AnyValue::Null => None,
            AnyValue::String(s) => Some(s.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Every value of a column rendered as text
    pub fn column_values(&self, column: &str) -> Result<Vec<Option<String>>> {
        let series = self
            .frame
            .column(column)
            .map_err(|_| RegistryError::format(&self.name, format!("no column '{}'", column)))?;
        as_strings(&self.name, series)
    }

    /// Non-missing values of a column, in row order
    pub fn column_strings(&self, column: &str) -> Result<Vec<String>> {
        Ok(self.column_values(column)?.into_iter().flatten().collect())
    }

    /// Unit of a column when the table was loaded with a units row
    pub fn unit(&self, column: &str) -> Option<&str> {
        self.units.get(column).map(String::as_str)
    }

    pub fn units(&self) -> &HashMap<String, String> {
        &self.units
    }

    /// Total number of missing cells
    pub fn missing_cells(&self) -> usize {
        self.frame.get_columns().iter().map(|s| s.null_count()).sum()
    }

    /// The first `n` rows rendered as text, missing cells as empty strings
    pub fn head_rows(&self, n: usize) -> Result<Vec<Vec<String>>> {
        let n = n.min(self.height());
        let mut rows = vec![Vec::with_capacity(self.frame.width()); n];
        for series in self.frame.get_columns() {
            let values = as_strings(&self.name, &series.head(Some(n)))?;
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value.unwrap_or_default());
            }
        }
        Ok(rows)
    }
}

fn as_strings(name: &str, series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series
        .cast(&DataType::String)
        .map_err(|e| RegistryError::format(name, e))?;
    let ca = cast.str().map_err(|e| RegistryError::format(name, e))?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Header and first line, every column as text
fn read_head(name: &str, bytes: &[u8], skip_rows: usize) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(skip_rows)
        .with_n_rows(Some(1))
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| RegistryError::format(name, e))
}

/// String dtypes for the requested text columns the file actually has
fn text_schema(name: &str, bytes: &[u8], opts: &LoadOptions) -> Result<Option<SchemaRef>> {
    if opts.text_columns.is_empty() {
        return Ok(None);
    }
    let head = read_head(name, bytes, opts.skip_rows)?;
    let present = head.get_column_names();
    let fields: Vec<Field> = opts
        .text_columns
        .iter()
        .filter(|c| present.contains(&c.as_str()))
        .map(|c| Field::new(c, DataType::String))
        .collect();
    if fields.is_empty() {
        return Ok(None);
    }
    Ok(Some(Arc::new(Schema::from_iter(fields))))
}

/// Read the line after the header as per-column units
fn read_units(name: &str, bytes: &[u8], skip_rows: usize) -> Result<HashMap<String, String>> {
    let head = read_head(name, bytes, skip_rows)?;

    if head.height() == 0 {
        return Err(RegistryError::format(name, "missing units row"));
    }

    let mut units = HashMap::new();
    for series in head.get_columns() {
        let unit = series
            .str()
            .map_err(|e| RegistryError::format(name, e))?
            .get(0)
            .ok_or_else(|| {
                RegistryError::format(name, format!("no unit for column '{}'", series.name()))
            })?;
        if unit != UNITLESS {
            units.insert(series.name().to_string(), unit.to_string());
        }
    }
    Ok(units)
}

fn resolve_index(name: &str, frame: &DataFrame, spec: &IndexSpec) -> Result<Vec<String>> {
    let cols = match spec {
        IndexSpec::None => return Ok(Vec::new()),
        IndexSpec::Columns(cols) => cols,
    };
    let names = frame.get_column_names();

    let mut resolved = Vec::with_capacity(cols.len());
    for col in cols {
        let found = match col {
            IndexColumn::Name(n) => names.iter().find(|c| **c == n.as_str()),
            IndexColumn::Position(p) => names.get(*p),
        };
        match found {
            Some(c) => resolved.push(c.to_string()),
            None => {
                return Err(RegistryError::format(
                    name,
                    format!("index column '{}' not found", col),
                ))
            }
        }
    }

    let mut seen = HashSet::new();
    if !resolved.iter().all(|c| seen.insert(c.as_str())) {
        return Err(RegistryError::format(name, "index column listed twice"));
    }
    Ok(resolved)
}

/// Index values of every row, one entry per index column
fn key_parts(name: &str, frame: &DataFrame, index_columns: &[String]) -> Result<Vec<Vec<String>>> {
    if index_columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts: Vec<Vec<Option<String>>> = Vec::with_capacity(index_columns.len());
    for col in index_columns {
        let series = frame
            .column(col)
            .map_err(|e| RegistryError::format(name, e))?;
        parts.push(as_strings(name, series)?);
    }

    let mut keys = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        let mut key = Vec::with_capacity(parts.len());
        for (col, values) in index_columns.iter().zip(&parts) {
            match &values[row] {
                Some(v) => key.push(v.clone()),
                None => {
                    return Err(RegistryError::format(
                        name,
                        format!("missing value in index column '{}' at row {}", col, row),
                    ))
                }
            }
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Replace every missing cell with `fill`, across all columns
fn fill_missing(name: &str, frame: DataFrame, fill: &FillValue) -> Result<DataFrame> {
    let exprs: Vec<Expr> = frame
        .get_columns()
        .iter()
        .filter(|s| s.null_count() > 0)
        .map(|s| {
            let c = col(s.name());
            match fill {
                FillValue::Text(text) if s.dtype() == &DataType::String => {
                    c.fill_null(lit(text.clone()))
                }
                FillValue::Text(text) => c.cast(DataType::String).fill_null(lit(text.clone())),
                FillValue::Number(n) if s.dtype().is_numeric() => c.fill_null(lit(*n)),
                FillValue::Number(n) => c.cast(DataType::String).fill_null(lit(n.to_string())),
            }
        })
        .collect();

    if exprs.is_empty() {
        return Ok(frame);
    }

    frame
        .lazy()
        .with_columns(exprs)
        .collect()
        .map_err(|e| RegistryError::format(name, e))
}
