use async_trait::async_trait;
use hydromap_core::error::Result;
use hydromap_core::models::DelineationResponse;
use sha2::{Digest, Sha256};

/// Port for delineation result caching
///
/// Keys are the snapped pour-point strings produced by `PourPoint::cache_key`.
/// Backends store whole responses and never expire them.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Look up a cached response
    async fn get(&self, key: &str) -> Result<Option<DelineationResponse>>;

    /// Store a response, overwriting any previous value for the key
    async fn put(&self, key: &str, response: &DelineationResponse) -> Result<()>;

    /// Remove every cached response and return how many were removed
    async fn clear(&self) -> Result<usize>;

    /// Short backend name for logs and status output
    fn backend_name(&self) -> &'static str;
}

/// Hex digest of a cache key, used for file names and store keys
pub fn key_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}
