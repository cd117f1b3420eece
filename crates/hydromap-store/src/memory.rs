//! In-memory result cache for development and testing.
//!
//! This implementation uses `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For production workloads, use the file or Redis backend.

use async_trait::async_trait;
use hydromap_core::error::Result;
use hydromap_core::models::DelineationResponse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ports::ResultCache;

/// In-memory implementation of ResultCache
#[derive(Debug, Clone, Default)]
pub struct MemoryResultCache {
    entries: Arc<RwLock<HashMap<String, DelineationResponse>>>,
}

impl MemoryResultCache {
    /// Create a new in-memory result cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached responses
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<DelineationResponse>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, response: &DelineationResponse) -> Result<()> {
        self.entries.write().unwrap().insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.write().unwrap();
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
