//! Config loading error-message and discovery integration tests.

use assert_fs::prelude::*;
use environ_core::{config, RegistryError};
use predicates::prelude::predicate;
use std::fs;

const VALID: &str = r#"
environs:
  - name: prod
    remote: { type: fs, path: blobs }
    files: [api/.env.prod]
    ref: prod.ref
"#;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_file_returns_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("environ.yaml");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, RegistryError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("environ.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("environ.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("environ.yaml"), "must contain file path, got: {msg}");
    let source_msg = match &err {
        RegistryError::Parse { source, .. } => source.to_string(),
        _ => unreachable!(),
    };
    assert!(!source_msg.is_empty(), "serde_yaml must provide error context");
}

#[test]
fn load_unknown_top_level_key_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("environ.yaml");
    file.write_str("environments: []\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
}

#[test]
fn missing_required_field_is_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("environ.yaml");
    file.write_str("environs:\n  - name: prod\n    remote: { type: local, path: x }\n    files: []\n")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("ref"), "error should name the missing field, got: {msg}");
}

// ---------------------------------------------------------------------------
// 2. Discovery
// ---------------------------------------------------------------------------

#[test]
fn discovery_prefers_nearest_config() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("environ.yaml").write_str(VALID).expect("outer");
    dir.child("svc/environ.yaml").write_str("environs: []\n").expect("inner");
    dir.child("svc/deep/nested").create_dir_all().expect("mkdir");

    let found = config::discover_from(&dir.path().join("svc/deep/nested")).expect("discover");
    assert_eq!(found, dir.path().join("svc/environ.yaml"));
}

#[test]
fn discovery_without_config_names_start_dir() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let start = dir.path().join("empty");
    fs::create_dir_all(&start).expect("mkdir");

    // An ancestor of the temp dir may legitimately hold a config; only assert
    // the error shape when discovery fails.
    if let Err(err) = config::discover_from(&start) {
        assert!(matches!(err, RegistryError::ConfigNotFound { .. }));
        assert!(err.to_string().contains("environ.yaml not found"));
    }
}

#[test]
fn load_from_resolves_fs_remote_against_config_dir() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("environ.yaml").write_str(VALID).expect("write");
    dir.child("sub").create_dir_all().expect("mkdir");

    let registry = config::load_from(&dir.path().join("sub")).expect("load");
    let prod = registry.get(&"prod".into()).expect("prod");
    let expected = format!("fs({}, environ)", dir.path().join("blobs").display());
    assert_eq!(prod.remote().to_string(), expected);

    // Loading must not touch the filesystem beyond reading the config.
    dir.child("blobs").assert(predicate::path::missing());
}
