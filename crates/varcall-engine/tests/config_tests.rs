//! Loading dispatch configuration from disk

use std::io::Write;

use varcall_engine::{Bridge, BridgeError, DispatchConfig, PassThroughGenerator};

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "validate_entry_points = false").unwrap();
    writeln!(file, "record_stats = false").unwrap();

    let config = DispatchConfig::from_path(file.path()).unwrap();
    assert!(!config.validate_entry_points);
    assert!(!config.record_stats);

    let bridge = Bridge::with_config(PassThroughGenerator::new(), config.clone());
    assert_eq!(bridge.config(), &config);
    assert_eq!(bridge.generator_name(), "pass-through");
}

#[test]
fn test_invalid_file_reports_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "record_stats = \"sometimes\"").unwrap();

    let err = DispatchConfig::from_path(file.path()).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigParse(_)));
    assert!(err.to_string().starts_with("Invalid config"));
}

#[test]
fn test_stats_snapshot_serializes() {
    let bridge = Bridge::new(PassThroughGenerator::new());
    let json = serde_json::to_value(bridge.stats()).unwrap();
    assert_eq!(json["slow_path_entries"], 0);
    assert_eq!(json["rejected_entries"], 0);
}
