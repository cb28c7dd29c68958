//! In-process TTL cache

use super::CacheGateway;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Writes between sweeps of expired entries
pub const SWEEP_INTERVAL: usize = 128;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Used by tests and as the fallback when Redis is unreachable
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    writes: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|e| e.values().filter(|entry| !entry.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.get(key).is_some_and(|entry| !entry.is_expired()))
            .unwrap_or(false)
    }

    /// Stored entries, expired ones not yet swept included
    pub fn stored(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn clear_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) {
        let entry = CacheEntry {
            value,
            expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), entry);
        }

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.clear_expired();
        }
    }
}
