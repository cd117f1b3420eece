//! Result cache construction from configuration.

use hydromap_core::config::{CacheBackend, HydroConfig};
use hydromap_core::error::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::file::FileResultCache;
use crate::ports::ResultCache;
use crate::redis_store::RedisResultCache;

/// How long to wait for Redis before falling back to the file backend
pub const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Build the configured result cache.
///
/// Returns `None` when caching is disabled. A Redis backend that cannot be
/// reached within [`REDIS_CONNECT_TIMEOUT`] falls back to the file backend;
/// this is the only retry the cache layer performs. The file backend's
/// directory is created up front.
pub async fn connect_result_cache(config: &HydroConfig) -> Result<Option<Arc<dyn ResultCache>>> {
    connect_with_timeout(config, REDIS_CONNECT_TIMEOUT).await
}

async fn connect_with_timeout(
    config: &HydroConfig,
    redis_timeout: Duration,
) -> Result<Option<Arc<dyn ResultCache>>> {
    if !config.cache_enabled.value {
        tracing::info!("Result cache disabled");
        return Ok(None);
    }

    if config.cache_backend.value == CacheBackend::Redis {
        let url = config.redis_url();
        let connect = RedisResultCache::connect(&url, config.redis_namespace.value.clone());
        match tokio::time::timeout(redis_timeout, connect).await {
            Ok(Ok(cache)) => {
                tracing::info!(url = %url, namespace = %cache.namespace(), "Using Redis result cache");
                return Ok(Some(Arc::new(cache)));
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %url, error = %e, "Redis unavailable, falling back to file cache");
            }
            Err(_) => {
                tracing::warn!(
                    url = %url,
                    timeout_ms = redis_timeout.as_millis() as u64,
                    "Redis connection timed out, falling back to file cache"
                );
            }
        }
    }

    let cache = FileResultCache::new(&config.cache_dir.value);
    cache.ensure_dir().await?;
    tracing::info!(dir = %cache.dir().display(), "Using file result cache");
    Ok(Some(Arc::new(cache)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydromap_core::config::{CliConfigOverrides, ConfigSource};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_disabled_cache_builds_nothing() {
        let mut config = HydroConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides { cache_enabled: Some(false), ..Default::default() });
        assert!(connect_result_cache(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backend_creates_directory() {
        let dir = TempDir::new().unwrap();
        let mut config = HydroConfig::with_defaults();
        config.cache_dir.update(dir.path().join("cache"), ConfigSource::Cli);

        let cache = connect_result_cache(&config).await.unwrap().unwrap();
        assert_eq!(cache.backend_name(), "file");
        assert!(dir.path().join("cache").join("watersheds").is_dir());
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_file() {
        let dir = TempDir::new().unwrap();
        let mut config = HydroConfig::with_defaults();
        config.cache_backend.update(CacheBackend::Redis, ConfigSource::Cli);
        config.redis_port.update(1, ConfigSource::Cli);
        config.cache_dir.update(dir.path().to_path_buf(), ConfigSource::Cli);

        let cache = connect_result_cache(&config).await.unwrap().unwrap();
        assert_eq!(cache.backend_name(), "file");
    }

    #[tokio::test]
    async fn test_silent_redis_host_times_out_to_file() {
        let dir = TempDir::new().unwrap();
        let mut config = HydroConfig::with_defaults();
        config.cache_backend.update(CacheBackend::Redis, ConfigSource::Cli);
        // Non-routable address: connection attempts hang rather than fail
        config.redis_host.update("10.255.255.1".to_string(), ConfigSource::Cli);
        config.cache_dir.update(dir.path().to_path_buf(), ConfigSource::Cli);

        let started = std::time::Instant::now();
        let cache = connect_with_timeout(&config, Duration::from_millis(200)).await.unwrap().unwrap();
        assert_eq!(cache.backend_name(), "file");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
