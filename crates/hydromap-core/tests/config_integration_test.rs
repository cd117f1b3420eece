//! Integration tests for layered configuration
//!
//! These tests verify that configuration loading follows the correct precedence:
//! CLI arguments > Environment variables > Config file > Defaults

use hydromap_core::config::{CacheBackend, CliConfigOverrides, ConfigSource, HydroConfig};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const VARS: &[&str] = &[
    "HYDROMAP_FLOW_DIR_PATH",
    "HYDROMAP_CACHE_BACKEND",
    "HYDROMAP_CACHE_ENABLED",
    "HYDROMAP_DEFAULT_SNAP_RADIUS",
    "HYDROMAP_REDIS_PORT",
    "HYDROMAP_REDIS_NAMESPACE",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

fn config_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
flow_dir_path = "/from/file/fdir.tif"

[cache]
backend = "redis"

[snap]
default_radius = 300
"#
    )
    .unwrap();
    file
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = config_file();

    env::set_var("HYDROMAP_FLOW_DIR_PATH", "/from/env/fdir.tif");
    env::set_var("HYDROMAP_DEFAULT_SNAP_RADIUS", "50");

    let config = HydroConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();

    assert_eq!(config.flow_dir_path.value, PathBuf::from("/from/env/fdir.tif"));
    assert_eq!(config.flow_dir_path.source, ConfigSource::Environment);
    assert_eq!(config.default_snap_radius.value, 50);
    // Not set in the environment, so the file wins
    assert_eq!(config.cache_backend.value, CacheBackend::Redis);
    assert_eq!(config.cache_backend.source, ConfigSource::File);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_values_are_ignored() {
    clear_env();

    env::set_var("HYDROMAP_CACHE_BACKEND", "memcached");
    env::set_var("HYDROMAP_CACHE_ENABLED", "sometimes");
    env::set_var("HYDROMAP_DEFAULT_SNAP_RADIUS", "5000");
    env::set_var("HYDROMAP_REDIS_PORT", "not-a-port");

    let config = HydroConfig::with_defaults().load_from_env();

    assert_eq!(config.cache_backend.value, CacheBackend::File);
    assert_eq!(config.cache_backend.source, ConfigSource::Default);
    assert!(config.cache_enabled.value);
    assert_eq!(config.default_snap_radius.value, 100);
    assert_eq!(config.redis_port.value, 6379);

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_everything() {
    clear_env();
    let file = config_file();
    env::set_var("HYDROMAP_CACHE_ENABLED", "true");
    env::set_var("HYDROMAP_REDIS_NAMESPACE", "tests:watershed");

    let mut config = HydroConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();
    config.update_from_cli(CliConfigOverrides {
        cache_enabled: Some(false),
        cache_backend: Some(CacheBackend::File),
        ..Default::default()
    });

    assert!(!config.cache_enabled.value);
    assert_eq!(config.cache_enabled.source, ConfigSource::Cli);
    assert_eq!(config.cache_backend.value, CacheBackend::File);
    assert_eq!(config.redis_namespace.value, "tests:watershed");

    let map = config.to_inspection_map();
    assert_eq!(map["cache_enabled"], ("false".to_string(), ConfigSource::Cli));
    assert_eq!(map["redis_namespace"].1, ConfigSource::Environment);

    clear_env();
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "this is = = not toml").unwrap();
    assert!(HydroConfig::with_defaults().load_from_file(file.path()).is_err());
}
