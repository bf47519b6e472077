//! Configuration file handling

use nav_engine::{EngineConfig, NavError, Units};

#[test]
fn save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = EngineConfig::default();
    config.update_units(Units::Imperial);
    config.corridor_tolerance_m = 75.0;
    config.save_to_path(&path).unwrap();

    let loaded = EngineConfig::load_from_path(&path).unwrap();
    assert_eq!(loaded.units, Units::Imperial);
    assert_eq!(loaded.corridor_tolerance_m, 75.0);
    assert_eq!(loaded.search_radius_m, config.search_radius_m);
}

#[test]
fn invalid_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(EngineConfig::load_from_path(&path), Err(NavError::Config(_))));

    std::fs::write(&path, r#"{"region_cell_level": 40}"#).unwrap();
    assert!(matches!(EngineConfig::load_from_path(&path), Err(NavError::Config(_))));

    let missing = dir.path().join("missing.json");
    assert!(EngineConfig::load_from_path(&missing).is_err());
}
