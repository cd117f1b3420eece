use crate::error::{HydroError, Result};
use crate::models::raster::RasterLayer;
use crate::models::response::validate_snap_radius;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Where delineation results are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON file per key under the cache directory
    File,
    /// Networked key-value store
    Redis,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::File => f.write_str("file"),
            CacheBackend::Redis => f.write_str("redis"),
        }
    }
}

/// Default configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "hydromap.toml";

/// Layered configuration for the delineation engine
#[derive(Debug, Clone)]
pub struct HydroConfig {
    pub dem_path: ConfigValue<PathBuf>,
    pub flow_dir_path: ConfigValue<PathBuf>,
    pub flow_acc_path: ConfigValue<PathBuf>,
    pub cache_enabled: ConfigValue<bool>,
    pub cache_backend: ConfigValue<CacheBackend>,
    pub cache_dir: ConfigValue<PathBuf>,
    pub snap_to_stream: ConfigValue<bool>,
    pub default_snap_radius: ConfigValue<u32>,
    pub redis_host: ConfigValue<String>,
    pub redis_port: ConfigValue<u16>,
    pub redis_db: ConfigValue<u32>,
    pub redis_namespace: ConfigValue<String>,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl HydroConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let default = ConfigSource::Default;
        Self {
            dem_path: ConfigValue::new(
                PathBuf::from("../data/processed/dem/filled_dem.tif"),
                default,
            ),
            flow_dir_path: ConfigValue::new(
                PathBuf::from("../data/processed/dem/flow_direction.tif"),
                default,
            ),
            flow_acc_path: ConfigValue::new(
                PathBuf::from("../data/processed/dem/flow_accumulation.tif"),
                default,
            ),
            cache_enabled: ConfigValue::new(true, default),
            cache_backend: ConfigValue::new(CacheBackend::File, default),
            cache_dir: ConfigValue::new(PathBuf::from("./data/cache"), default),
            snap_to_stream: ConfigValue::new(true, default),
            default_snap_radius: ConfigValue::new(100, default),
            redis_host: ConfigValue::new("localhost".to_string(), default),
            redis_port: ConfigValue::new(6379, default),
            redis_db: ConfigValue::new(0, default),
            redis_namespace: ConfigValue::new("hydromap:watershed".to_string(), default),
        }
    }

    /// Defaults, then `hydromap.toml` if present, then environment
    pub fn load() -> Result<Self> {
        let mut config = Self::with_defaults();
        if Path::new(CONFIG_FILE_NAME).exists() {
            config = config.load_from_file(CONFIG_FILE_NAME)?;
        }
        Ok(config.load_from_env())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| HydroError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| HydroError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let source = ConfigSource::File;

        if let Some(path) = file_config.dem_path {
            self.dem_path.update(path, source);
        }
        if let Some(path) = file_config.flow_dir_path {
            self.flow_dir_path.update(path, source);
        }
        if let Some(path) = file_config.flow_acc_path {
            self.flow_acc_path.update(path, source);
        }

        if let Some(cache) = file_config.cache {
            if let Some(enabled) = cache.enabled {
                self.cache_enabled.update(enabled, source);
            }
            if let Some(backend) = cache.backend {
                self.cache_backend.update(backend, source);
            }
            if let Some(dir) = cache.dir {
                self.cache_dir.update(dir, source);
            }
        }

        if let Some(snap) = file_config.snap {
            if let Some(enabled) = snap.to_stream {
                self.snap_to_stream.update(enabled, source);
            }
            if let Some(radius) = snap.default_radius {
                self.default_snap_radius.update(validate_snap_radius(radius)?, source);
            }
        }

        if let Some(redis) = file_config.redis {
            if let Some(host) = redis.host {
                self.redis_host.update(host, source);
            }
            if let Some(port) = redis.port {
                self.redis_port.update(port, source);
            }
            if let Some(db) = redis.db {
                self.redis_db.update(db, source);
            }
            if let Some(namespace) = redis.namespace {
                self.redis_namespace.update(namespace, source);
            }
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        let source = ConfigSource::Environment;

        if let Ok(path) = env::var("HYDROMAP_DEM_PATH") {
            self.dem_path.update(PathBuf::from(path), source);
        }
        if let Ok(path) = env::var("HYDROMAP_FLOW_DIR_PATH") {
            self.flow_dir_path.update(PathBuf::from(path), source);
        }
        if let Ok(path) = env::var("HYDROMAP_FLOW_ACC_PATH") {
            self.flow_acc_path.update(PathBuf::from(path), source);
        }

        if let Ok(raw) = env::var("HYDROMAP_CACHE_ENABLED") {
            match parse_bool(&raw) {
                Ok(enabled) => self.cache_enabled.update(enabled, source),
                Err(_) => tracing::warn!(
                    "Invalid HYDROMAP_CACHE_ENABLED value '{}': expected true or false",
                    raw
                ),
            }
        }

        if let Ok(raw) = env::var("HYDROMAP_CACHE_BACKEND") {
            match parse_cache_backend(&raw) {
                Ok(backend) => self.cache_backend.update(backend, source),
                Err(_) => tracing::warn!(
                    "Invalid HYDROMAP_CACHE_BACKEND value '{}': expected file or redis",
                    raw
                ),
            }
        }

        if let Ok(dir) = env::var("HYDROMAP_CACHE_DIR") {
            self.cache_dir.update(PathBuf::from(dir), source);
        }

        if let Ok(raw) = env::var("HYDROMAP_SNAP_TO_STREAM") {
            match parse_bool(&raw) {
                Ok(enabled) => self.snap_to_stream.update(enabled, source),
                Err(_) => tracing::warn!(
                    "Invalid HYDROMAP_SNAP_TO_STREAM value '{}': expected true or false",
                    raw
                ),
            }
        }

        if let Ok(raw) = env::var("HYDROMAP_DEFAULT_SNAP_RADIUS") {
            match raw.trim().parse::<i64>().map_err(|_| ()).and_then(|r| {
                validate_snap_radius(r).map_err(|_| ())
            }) {
                Ok(radius) => self.default_snap_radius.update(radius, source),
                Err(_) => tracing::warn!(
                    "Invalid HYDROMAP_DEFAULT_SNAP_RADIUS value '{}': expected meters in 0..=1000",
                    raw
                ),
            }
        }

        if let Ok(host) = env::var("HYDROMAP_REDIS_HOST") {
            self.redis_host.update(host, source);
        }

        if let Ok(raw) = env::var("HYDROMAP_REDIS_PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.redis_port.update(port, source),
                Err(_) => {
                    tracing::warn!("Invalid HYDROMAP_REDIS_PORT value '{}': expected a port", raw)
                }
            }
        }

        if let Ok(raw) = env::var("HYDROMAP_REDIS_DB") {
            match raw.trim().parse::<u32>() {
                Ok(db) => self.redis_db.update(db, source),
                Err(_) => tracing::warn!(
                    "Invalid HYDROMAP_REDIS_DB value '{}': expected a database index",
                    raw
                ),
            }
        }

        if let Ok(namespace) = env::var("HYDROMAP_REDIS_NAMESPACE") {
            self.redis_namespace.update(namespace, source);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        let source = ConfigSource::Cli;

        if let Some(path) = overrides.dem_path {
            self.dem_path.update(path, source);
        }
        if let Some(path) = overrides.flow_dir_path {
            self.flow_dir_path.update(path, source);
        }
        if let Some(path) = overrides.flow_acc_path {
            self.flow_acc_path.update(path, source);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache_enabled.update(enabled, source);
        }
        if let Some(backend) = overrides.cache_backend {
            self.cache_backend.update(backend, source);
        }
        if let Some(dir) = overrides.cache_dir {
            self.cache_dir.update(dir, source);
        }
    }

    /// Path of one of the three input rasters
    pub fn raster_path(&self, layer: RasterLayer) -> &Path {
        match layer {
            RasterLayer::Dem => &self.dem_path.value,
            RasterLayer::FlowDirection => &self.flow_dir_path.value,
            RasterLayer::FlowAccumulation => &self.flow_acc_path.value,
        }
    }

    /// Connection URL for the redis backend
    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_host.value, self.redis_port.value, self.redis_db.value
        )
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        let mut path = |key: &str, value: &ConfigValue<PathBuf>| {
            map.insert(key.to_string(), (value.value.display().to_string(), value.source));
        };
        path("dem_path", &self.dem_path);
        path("flow_dir_path", &self.flow_dir_path);
        path("flow_acc_path", &self.flow_acc_path);
        path("cache_dir", &self.cache_dir);

        map.insert(
            "cache_enabled".to_string(),
            (self.cache_enabled.value.to_string(), self.cache_enabled.source),
        );
        map.insert(
            "cache_backend".to_string(),
            (self.cache_backend.value.to_string(), self.cache_backend.source),
        );
        map.insert(
            "snap_to_stream".to_string(),
            (self.snap_to_stream.value.to_string(), self.snap_to_stream.source),
        );
        map.insert(
            "default_snap_radius".to_string(),
            (self.default_snap_radius.value.to_string(), self.default_snap_radius.source),
        );
        map.insert(
            "redis_host".to_string(),
            (self.redis_host.value.clone(), self.redis_host.source),
        );
        map.insert(
            "redis_port".to_string(),
            (self.redis_port.value.to_string(), self.redis_port.source),
        );
        map.insert("redis_db".to_string(), (self.redis_db.value.to_string(), self.redis_db.source));
        map.insert(
            "redis_namespace".to_string(),
            (self.redis_namespace.value.clone(), self.redis_namespace.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    dem_path: Option<PathBuf>,
    flow_dir_path: Option<PathBuf>,
    flow_acc_path: Option<PathBuf>,
    cache: Option<FileCacheSection>,
    snap: Option<FileSnapSection>,
    redis: Option<FileRedisSection>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FileCacheSection {
    enabled: Option<bool>,
    backend: Option<CacheBackend>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FileSnapSection {
    to_stream: Option<bool>,
    default_radius: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FileRedisSection {
    host: Option<String>,
    port: Option<u16>,
    db: Option<u32>,
    namespace: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub dem_path: Option<PathBuf>,
    pub flow_dir_path: Option<PathBuf>,
    pub flow_acc_path: Option<PathBuf>,
    pub cache_enabled: Option<bool>,
    pub cache_backend: Option<CacheBackend>,
    pub cache_dir: Option<PathBuf>,
}

/// Parse cache backend from string
pub fn parse_cache_backend(s: &str) -> Result<CacheBackend> {
    match s.trim().to_lowercase().as_str() {
        "file" | "disk" => Ok(CacheBackend::File),
        "redis" => Ok(CacheBackend::Redis),
        _ => Err(HydroError::ConfigInvalid {
            key: "cache_backend".to_string(),
            reason: format!("Invalid cache backend: {}. Use file or redis", s),
        }),
    }
}

/// Parse a boolean flag the way environment variables usually spell it
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(HydroError::ConfigInvalid {
            key: "bool".to_string(),
            reason: format!("Invalid boolean: {}", s),
        }),
    }
}
