// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-process cache fallback.
//!
//! Holds entries in a mutex-guarded map with per-entry deadlines. Expiry is
//! checked lazily on read; there is no background sweep. When the map is
//! full, expired entries are purged first, then the entry closest to expiry
//! is evicted.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tidedesk_core::TidedeskError;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::backend::CacheBackend;

enum Value {
    Text(String),
    List(Vec<String>),
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache with the same TTL semantics as the Redis backend.
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl MemoryBackend {
    /// Create a fallback store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Make room for one more entry. Purges expired entries first; if the
    /// map is still full, evicts the entry closest to expiry.
    fn make_room(&self, entries: &mut HashMap<String, Entry>, key: &str, now: Instant) {
        if entries.contains_key(key) || entries.len() < self.capacity {
            return;
        }
        entries.retain(|_, entry| !entry.expired(now));
        while entries.len() >= self.capacity {
            let Some(victim) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone())
            else {
                return;
            };
            entries.remove(&victim);
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "in-process"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TidedeskError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            _ => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TidedeskError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        self.make_room(&mut entries, key, now);
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn list_push_trim(
        &self,
        key: &str,
        value: &str,
        cap: usize,
        ttl: Duration,
    ) -> Result<(), TidedeskError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        self.make_room(&mut entries, key, now);

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(Vec::new()),
            expires_at: now + ttl,
        });
        // Expired or non-list entries start over as a fresh list.
        if entry.expired(now) || !matches!(entry.value, Value::List(_)) {
            entry.value = Value::List(Vec::new());
        }
        if let Value::List(ref mut list) = entry.value {
            list.insert(0, value.to_string());
            list.truncate(cap);
        }
        // Refresh the TTL on every push, matching EXPIRE after LPUSH.
        entry.expires_at = now + ttl;
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, TidedeskError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                Ok(Vec::new())
            }
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(list.iter().take(limit).cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<(), TidedeskError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), TidedeskError> {
        self.entries.lock().await.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<bool, TidedeskError> {
        Ok(true)
    }
}
