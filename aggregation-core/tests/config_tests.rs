// Integration tests for loading aggregation options
use aggregation_core::pipeline::unwind;
use aggregation_core::{Aggregation, AggregationError, AggregationOptions, Pipeline, RootContext};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_options_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("aggregation.toml");
    fs::write(&path, "allow_disk_use = true\nbatch_size = 64\n").unwrap();

    let options = AggregationOptions::from_file(&path).unwrap();
    assert_eq!(
        options,
        AggregationOptions::new()
            .with_allow_disk_use(true)
            .with_batch_size(64)
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = AggregationOptions::from_file(temp_dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, AggregationError::Io(_)));
}

#[test]
fn test_load_or_default_without_file() {
    let temp_dir = TempDir::new().unwrap();
    let options = AggregationOptions::load_or_default(temp_dir.path().join("missing.toml")).unwrap();
    assert_eq!(options, AggregationOptions::default());
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("aggregation.toml");
    fs::write(&path, "batch_size = \"many\"\n").unwrap();

    let err = AggregationOptions::load_or_default(&path).unwrap_err();
    assert!(matches!(err, AggregationError::Config(_)));
}

#[test]
fn test_loaded_options_flow_into_command() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("aggregation.toml");
    fs::write(&path, "explain = true\n").unwrap();

    let options = AggregationOptions::load_or_default(&path).unwrap();
    let pipeline = Pipeline::new(vec![unwind("items").unwrap()]).unwrap();
    let command = Aggregation::new("orders", pipeline)
        .unwrap()
        .with_options(options)
        .to_command(&RootContext)
        .unwrap();

    assert_eq!(
        command,
        json!({
            "aggregate": "orders",
            "pipeline": [{"$unwind": {"path": "$items", "preserveNullAndEmptyArrays": false}}],
            "explain": true
        })
    );
}
