//! One JSON file per cached response.

use async_trait::async_trait;
use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::DelineationResponse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::{key_digest, ResultCache};

/// Subdirectory of the cache directory holding watershed entries
pub const WATERSHED_SUBDIR: &str = "watersheds";

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed result cache at `<cache_dir>/watersheds/<digest>.json`
#[derive(Debug, Clone)]
pub struct FileResultCache {
    dir: PathBuf,
}

impl FileResultCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self { dir: cache_dir.as_ref().join(WATERSHED_SUBDIR) }
    }

    /// Create the entry directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            HydroError::Cache(format!("Failed to create {}: {}", self.dir.display(), e))
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file that holds `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key_digest(key)))
    }
}

#[async_trait]
impl ResultCache for FileResultCache {
    async fn get(&self, key: &str) -> Result<Option<DelineationResponse>> {
        let path = self.entry_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HydroError::Cache(format!(
                    "Failed to read cache file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            HydroError::Cache(format!("Corrupt cache file {}: {}", path.display(), e))
        })
    }

    /// Entries are written to a private temporary file and renamed into
    /// place, so readers see either the old entry or the complete new one.
    async fn put(&self, key: &str, response: &DelineationResponse) -> Result<()> {
        self.ensure_dir().await?;

        let path = self.entry_path(key);
        let json = serde_json::to_vec(response)?;
        let tmp = path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            WRITE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(HydroError::Cache(format!(
                "Failed to write cache file {}: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(HydroError::Cache(e.to_string())),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| HydroError::Cache(e.to_string()))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete cache file")
                }
            }
        }

        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
