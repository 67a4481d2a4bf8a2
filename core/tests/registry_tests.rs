// Integration tests for the table registry
// Tests use REAL files under a temp dir — no mocks

use best_air_core::{
    DirectoryResources, IndexSpec, RegistryError, TableDefinition, TableRegistry,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_table(root: &Path, name: &str, csv: &str) {
    let dir = root.join("tables");
    fs::create_dir_all(&dir).expect("Failed to create tables dir");
    fs::write(dir.join(format!("{}.csv", name)), csv).expect("Failed to write table");
}

#[test]
fn test_bundled_tables_all_load() {
    let registry = TableRegistry::default();
    registry.load_all().expect("bundled tables should load");

    let caps = registry.get_table("CAP").expect("CAP");
    assert_eq!(caps.index_columns(), ["name".to_string()]);
    assert!(caps.lookup("CO", "description").is_some());
    assert_eq!(registry.load_count(), registry.definitions().len());
}

#[test]
fn test_directory_table_read_once() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_table(temp_dir.path(), "CAP", "name,description\nCO,Carbon monoxide\n");

    let registry = TableRegistry::new(DirectoryResources::new(temp_dir.path()));
    let first = registry.get_table("CAP").expect("first load");

    // Removing the file proves the second call doesn't touch disk
    fs::remove_file(temp_dir.path().join("tables/CAP.csv")).expect("Failed to remove");
    let second = registry.get_table("CAP").expect("cached load");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.load_count(), 1);
}

#[test]
fn test_unknown_versus_broken() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = TableRegistry::new(DirectoryResources::new(temp_dir.path()));

    let unknown = registry.get_table("no-such-table").unwrap_err();
    assert!(matches!(unknown, RegistryError::UnknownTable(_)));

    let missing = registry.get_table("TAC").unwrap_err();
    assert!(
        matches!(missing, RegistryError::ResourceAccess { .. }),
        "missing file for a defined table should be an access error: {:?}",
        missing
    );
}

#[test]
fn test_index_column_absent() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_table(temp_dir.path(), "CAP", "pollutant,description\nCO,Carbon monoxide\n");

    let registry = TableRegistry::new(DirectoryResources::new(temp_dir.path()));
    let err = registry.get_table("CAP").unwrap_err();
    match err {
        RegistryError::FileFormat { name, reason } => {
            assert_eq!(name, "CAP");
            assert!(reason.contains("name"), "reason was: {}", reason);
        }
        other => panic!("expected FileFormat, got {:?}", other),
    }
}

#[test]
fn test_fill_replaces_every_empty_cell() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_table(
        temp_dir.path(),
        "monitors",
        "site,county,pm25\nA,Fresno,\nB,,12\nC,Kern,9\n",
    );

    let defs = vec![TableDefinition::new("monitors")
        .with_index(IndexSpec::column("site"))
        .with_fill("X")];
    let registry =
        TableRegistry::with_definitions(defs, DirectoryResources::new(temp_dir.path()))
            .expect("definitions");
    let table = registry.get_table("monitors").expect("load");

    assert_eq!(table.missing_cells(), 0);
    assert_eq!(table.lookup("A", "pm25").as_deref(), Some("X"));
    assert_eq!(table.lookup("B", "county").as_deref(), Some("X"));
    assert_eq!(table.lookup("C", "county").as_deref(), Some("Kern"));
}

#[test]
fn test_add_table_with_skip_rows() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("emissions-2017.csv");
    fs::write(
        &path,
        "Source: CARB emission inventory\nUnits: tons/day\ncounty,NOx\nFresno,42.5\nKern,51.0\n",
    )
    .expect("Failed to write file");

    let registry = TableRegistry::default();
    registry
        .add_table(&path, IndexSpec::column("county"), 2)
        .expect("add_table");

    let table = registry.get_table("emissions-2017").expect("added table");
    assert_eq!(table.height(), 2);
    assert_eq!(table.index_values(), vec!["Fresno", "Kern"]);
    assert!(registry.loaded_names().contains(&"emissions-2017".to_string()));
}

#[test]
fn test_add_table_malformed_keeps_previous() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("foo.csv");
    let registry = TableRegistry::default();

    fs::write(&path, "k,v\na,1\n").expect("Failed to write file");
    let original = registry.add_table(&path, IndexSpec::column("k"), 0).expect("add");

    fs::write(&path, "k,v\nb,1\nb,2\n").expect("Failed to write file");
    let err = registry.add_table(&path, IndexSpec::column("k"), 0).unwrap_err();
    assert!(matches!(err, RegistryError::FileFormat { .. }));

    let current = registry.get_table("foo").expect("previous table survives");
    assert!(Arc::ptr_eq(&original, &current));
}

#[test]
fn test_add_table_with_late_placeholder() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("late.csv");
    let mut csv = String::from("key,ef\n");
    for i in 0..120 {
        csv.push_str(&format!("k{},{}.5\n", i, i));
    }
    csv.push_str("k999,n/a\n");
    fs::write(&path, csv).expect("Failed to write file");

    let registry = TableRegistry::default();
    let table = registry
        .add_table(&path, IndexSpec::column("key"), 0)
        .expect("placeholder after row 100 should load");
    assert_eq!(table.height(), 121);
    assert_eq!(table.lookup("k999", "ef").as_deref(), Some("n/a"));
}

#[test]
fn test_bundled_fips_codes_keep_zero_padding() {
    let registry = TableRegistry::default();
    let counties = registry.get_table("counties").expect("counties");
    assert_eq!(counties.lookup("0", "fips").as_deref(), Some("06001"));
    assert!(counties
        .column_strings("fips")
        .expect("fips column")
        .iter()
        .all(|code| code.len() == 5 && code.starts_with("06")));
}
