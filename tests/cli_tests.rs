// Integration tests for CLI command dispatch
// Commands run against real registries and write into a buffer

use best_air::cli::{exit_code_for, load_config, run_command, Args, Command};
use best_air::TableRegistry;
use best_air_core::{AppConfig, DirectoryResources};
use clap::Parser;
use std::fs;
use tempfile::TempDir;

fn run(registry: &TableRegistry, command: Command, json: bool) -> anyhow::Result<String> {
    let mut out = Vec::new();
    run_command(registry, &AppConfig::default(), &command, json, &mut out)?;
    Ok(String::from_utf8(out).expect("output should be UTF-8"))
}

#[test]
fn test_list_shows_every_definition() {
    let registry = TableRegistry::default();
    registry.get_table("CAP").expect("CAP");

    let output = run(&registry, Command::List, false).expect("list");
    let lines: Vec<&str> = output.lines().collect();
    assert!(lines[0].starts_with("name"));
    assert_eq!(lines.len(), 1 + registry.definitions().len());

    let cap_line = lines.iter().find(|l| l.starts_with("CAP")).expect("CAP row");
    assert!(cap_line.ends_with("yes"), "CAP should be loaded: {}", cap_line);
}

#[test]
fn test_list_json() {
    let registry = TableRegistry::default();
    let output = run(&registry, Command::List, true).expect("list");
    let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid JSON");
    let entries = parsed.as_array().expect("array");
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["name"], "CAP");
    assert_eq!(entries[0]["index"], "name");
    assert_eq!(entries[0]["loaded"], false);
}

#[test]
fn test_check_loads_everything() {
    let registry = TableRegistry::default();
    let output = run(&registry, Command::Check, false).expect("check");
    assert!(output.contains("counties"));
    assert_eq!(registry.loaded_names().len(), 6);
}

#[test]
fn test_show_limits_rows() {
    let registry = TableRegistry::default();
    let output = run(
        &registry,
        Command::Show {
            name: "counties".to_string(),
            rows: 2,
        },
        false,
    )
    .expect("show");
    assert!(output.starts_with("counties (58 rows, index: -)"));
    assert!(output.contains("Alameda"));
    assert!(!output.contains("Amador"));
    assert!(output.contains("... 56 more rows"));
}

#[test]
fn test_show_unknown_table_exit_code() {
    let registry = TableRegistry::default();
    let err = run(
        &registry,
        Command::Show {
            name: "nonexistent".to_string(),
            rows: 5,
        },
        false,
    )
    .unwrap_err();
    assert_eq!(exit_code_for(&err), 1);
}

#[test]
fn test_show_missing_resource_exit_code() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = TableRegistry::new(DirectoryResources::new(temp_dir.path()));
    let err = run(
        &registry,
        Command::Show {
            name: "CAP".to_string(),
            rows: 5,
        },
        false,
    )
    .unwrap_err();
    assert_eq!(exit_code_for(&err), 2);
}

#[test]
fn test_add_then_show_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("monitors.csv");
    fs::write(&path, "site,county\nFresno-Garland,Fresno\nBakersfield,Kern\n")
        .expect("Failed to write file");

    let registry = TableRegistry::default();
    let output = run(
        &registry,
        Command::Add {
            path: path.clone(),
            index_col: Some("site".to_string()),
            skip_rows: 0,
            rows: 10,
        },
        true,
    )
    .expect("add");

    let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid JSON");
    assert_eq!(parsed["name"], "monitors");
    assert_eq!(parsed["rows"], 2);
    assert_eq!(parsed["head"][1]["county"], "Kern");

    let shown = run(
        &registry,
        Command::Show {
            name: "monitors".to_string(),
            rows: 10,
        },
        false,
    )
    .expect("show added table");
    assert!(shown.starts_with("monitors (2 rows, index: site)"));
}

#[test]
fn test_model_json() {
    let registry = TableRegistry::default();
    let output = run(&registry, Command::Model, true).expect("model");
    let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid JSON");
    assert_eq!(parsed["first_year"], 2020);
    assert_eq!(parsed["counties"].as_array().map(Vec::len), Some(58));
    assert!(parsed["source_sectors"]["Mobile"].is_object());
}

#[test]
fn test_tables_dir_flag_overrides_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("best-air.toml");
    fs::write(&config_path, "[registry]\ntables_dir = \"/from/config\"\n")
        .expect("Failed to write config");

    let args = Args::try_parse_from([
        "best-air",
        "--config",
        config_path.to_str().unwrap(),
        "--tables-dir",
        "/from/flag",
        "list",
    ])
    .expect("args");
    let config = load_config(&args).expect("config");
    assert_eq!(
        config.registry.tables_dir.as_deref(),
        Some(std::path::Path::new("/from/flag"))
    );
}
