//! Key-value TTL cache in front of the screening stages.
//!
//! The cache is an optimization only: every read failure is a miss and
//! every write failure is logged and dropped.

pub mod memory;
pub mod redis_cache;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

use crate::models::Stage;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String, ttl_secs: u64);
}

/// `{stage}:{code}:{yyyymmdd}`
pub fn cache_key(stage: Stage, code: &str, date: NaiveDate) -> String {
    format!("{}:{}:{}", stage.as_str(), code, date.format("%Y%m%d"))
}

/// `{stage}:{yyyymmdd}` for whole-stage snapshots
pub fn snapshot_key(stage: Stage, date: NaiveDate) -> String {
    format!("{}:{}", stage.as_str(), date.format("%Y%m%d"))
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheGateway, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheGateway,
    key: &str,
    value: &T,
    ttl_secs: u64,
) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, raw, ttl_secs).await,
        Err(e) => warn!(key = %key, error = %e, "Failed to encode cache entry"),
    }
}
