//! Hydromap Store - Result cache ports and adapters
//!
//! This crate defines the delineation result cache port with file, Redis and
//! in-memory adapters, plus the mtime-coherent dataset cache.

pub mod backend;
pub mod dataset;
pub mod file;
pub mod memory;
pub mod ports;
pub mod redis_store;

pub use backend::{connect_result_cache, REDIS_CONNECT_TIMEOUT};
pub use dataset::DatasetCache;
pub use file::FileResultCache;
pub use memory::MemoryResultCache;
pub use ports::{key_digest, ResultCache};
pub use redis_store::RedisResultCache;
