//! CLI command dispatch
//!
//! Commands write to any `io::Write` so they can be driven from tests.

use crate::cli::args::{parse_index_spec, Args, Command};
use crate::cli::{ExitCode, EXIT_CONFIG_ERROR, EXIT_SUCCESS, EXIT_TABLE_ERROR};
use anyhow::{Context, Result};
use best_air_core::{logging, AppConfig, Model, RegistryError, Table, TableRegistry};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Write};
use tracing::debug;

/// One row of `list` output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub index: String,
    pub fill: Option<String>,
    pub has_units: bool,
    pub loaded: bool,
}

/// Run the parsed command line and return the process exit code
pub fn run_cli(args: Args) -> ExitCode {
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    if let Err(e) = logging::init_logging(&config.logging, args.verbose) {
        eprintln!("Error: {}", e);
        return EXIT_CONFIG_ERROR;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = TableRegistry::from_config(&config.registry)
        .context("Failed to set up table registry")
        .and_then(|registry| run_command(&registry, &config, &args.command, args.json, &mut out));

    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            debug!("Command failed: {:?}", e);
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    }
}

/// Config file and environment, with `--tables-dir` on top
pub fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = &args.tables_dir {
        config.registry.tables_dir = Some(dir.clone());
    }
    Ok(config)
}

/// Map an error to an exit code: table problems vs. environment problems
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<RegistryError>() {
        Some(RegistryError::UnknownTable(_)) | Some(RegistryError::FileFormat { .. }) => {
            EXIT_TABLE_ERROR
        }
        Some(RegistryError::ResourceAccess { .. }) | Some(RegistryError::Config(_)) => {
            EXIT_CONFIG_ERROR
        }
        None => EXIT_TABLE_ERROR,
    }
}

/// Execute one command against a registry
pub fn run_command(
    registry: &TableRegistry,
    config: &AppConfig,
    command: &Command,
    json_output: bool,
    out: &mut dyn Write,
) -> Result<()> {
    debug!("Running {:?}", command);
    match command {
        Command::List => {
            let summaries = list_tables(registry);
            if json_output {
                writeln!(out, "{}", serde_json::to_string_pretty(&summaries)?)?;
            } else {
                let header = ["name", "index", "fill", "units", "loaded"].map(String::from);
                let rows: Vec<Vec<String>> = summaries
                    .iter()
                    .map(|s| {
                        vec![
                            s.name.clone(),
                            s.index.clone(),
                            s.fill.clone().unwrap_or_else(|| "-".to_string()),
                            if s.has_units { "yes" } else { "no" }.to_string(),
                            if s.loaded { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                write!(out, "{}", render_grid(&header, &rows))?;
            }
        }
        Command::Check => {
            registry.load_all().context("Table check failed")?;
            let counts: Vec<(String, usize)> = registry
                .definitions()
                .iter()
                .map(|def| {
                    let height = registry.get_table(&def.name)?.height();
                    Ok((def.name.clone(), height))
                })
                .collect::<best_air_core::Result<_>>()?;
            if json_output {
                let map: serde_json::Map<String, serde_json::Value> =
                    counts.into_iter().map(|(n, c)| (n, json!(c))).collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&map)?)?;
            } else {
                for (name, rows) in counts {
                    writeln!(out, "ok  {:<16} {} rows", name, rows)?;
                }
            }
        }
        Command::Show { name, rows } => {
            let table = registry
                .get_table(name)
                .with_context(|| format!("Can't show table '{}'", name))?;
            write_table(out, &table, *rows, json_output)?;
        }
        Command::Add {
            path,
            index_col,
            skip_rows,
            rows,
        } => {
            let index = parse_index_spec(index_col.as_deref());
            let table = registry
                .add_table(path, index, *skip_rows)
                .with_context(|| format!("Can't add '{}'", path.display()))?;
            write_table(out, &table, *rows, json_output)?;
        }
        Command::Model => {
            let model = Model::new(registry, &config.model).context("Failed to build model")?;
            if json_output {
                writeln!(out, "{}", serde_json::to_string_pretty(&model)?)?;
            } else {
                write_model(out, &model)?;
            }
        }
    }
    Ok(())
}

pub fn list_tables(registry: &TableRegistry) -> Vec<TableSummary> {
    registry
        .definitions()
        .iter()
        .map(|def| TableSummary {
            name: def.name.clone(),
            index: def.index.to_string(),
            fill: def.fill.as_ref().map(|f| f.to_string()),
            has_units: def.has_units,
            loaded: registry.is_loaded(&def.name),
        })
        .collect()
}

fn write_table(out: &mut dyn Write, table: &Table, rows: usize, json_output: bool) -> Result<()> {
    let header = table.column_names();
    let body = table.head_rows(rows)?;

    if json_output {
        let records: Vec<serde_json::Value> = body
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = header
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| json!(v)))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        let doc = json!({
            "name": table.name(),
            "rows": table.height(),
            "index": table.index_columns(),
            "units": table.units(),
            "head": records,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        return Ok(());
    }

    writeln!(
        out,
        "{} ({} rows, index: {})",
        table.name(),
        table.height(),
        if table.has_index() {
            table.index_columns().join(",")
        } else {
            "-".to_string()
        }
    )?;
    write!(out, "{}", render_grid(&header, &body))?;
    if body.len() < table.height() {
        writeln!(out, "... {} more rows", table.height() - body.len())?;
    }
    Ok(())
}

fn write_model(out: &mut dyn Write, model: &Model) -> Result<()> {
    writeln!(out, "CAPs:          {}", model.cap_names.join(", "))?;
    writeln!(out, "TACs:          {}", model.tac_names.join(", "))?;
    writeln!(out, "Counties:      {}", model.counties.len())?;
    writeln!(out, "Air basins:    {}", model.air_basins.len())?;
    writeln!(out, "Air districts: {}", model.air_districts.len())?;
    writeln!(
        out,
        "Years:         {}-{} (discount rate {})",
        model.first_year, model.last_year, model.default_discount_rate
    )?;
    writeln!(out, "Source sectors:")?;
    for sector_type in &model.source_sector_types {
        writeln!(out, "  {}", sector_type)?;
        if let Some(categories) = model.source_sectors.get(sector_type) {
            for (category, names) in categories {
                writeln!(out, "    {}: {}", category, names.join(", "))?;
            }
        }
    }
    Ok(())
}

/// Left-aligned columns separated by two spaces
pub fn render_grid(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut text = line(header);
    for row in rows {
        text.push_str(&line(row.as_slice()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_grid_alignment() {
        let header = vec!["name".to_string(), "v".to_string()];
        let rows = vec![
            vec!["CO".to_string(), "1".to_string()],
            vec!["PM2.5".to_string(), "10".to_string()],
        ];
        assert_eq!(
            render_grid(&header, &rows),
            "name   v\nCO     1\nPM2.5  10\n"
        );
    }

    #[test]
    fn test_exit_codes() {
        let unknown = anyhow::Error::new(RegistryError::UnknownTable("x".into()));
        assert_eq!(exit_code_for(&unknown), EXIT_TABLE_ERROR);

        let access = anyhow::Error::new(RegistryError::ResourceAccess {
            path: "tables/x.csv".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        })
        .context("Can't show table 'x'");
        assert_eq!(exit_code_for(&access), EXIT_CONFIG_ERROR);
    }
}
