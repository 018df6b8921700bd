// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed cache implementation.
//!
//! Uses a multiplexed `ConnectionManager` cloned per operation, so no
//! app-level locking is needed. Single-key atomicity comes from Redis
//! itself; the push+trim+expire sequence in [`CacheBackend::list_push_trim`]
//! is near-atomic, not transactional.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tidedesk_core::TidedeskError;

use crate::backend::CacheBackend;

fn redis_err(message: &'static str) -> impl FnOnce(redis::RedisError) -> TidedeskError {
    move |e| TidedeskError::cache(message, e)
}

/// Cache backend talking to a Redis server.
pub struct RedisBackend {
    manager: ConnectionManager,
}

impl RedisBackend {
    /// Connect to Redis, bounding the attempt by `timeout` so an unreachable
    /// server fails fast into the in-process fallback.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, TidedeskError> {
        let client =
            redis::Client::open(url).map_err(|e| TidedeskError::cache("invalid redis URL", e))?;
        let manager = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| TidedeskError::Cache {
                message: format!("redis connection timed out after {timeout:?}"),
                source: None,
            })?
            .map_err(|e| TidedeskError::cache("redis connection failed", e))?;
        let backend = Self { manager };
        // A failed PING now is a failed startup selection, not a soft miss.
        if !backend.ping().await? {
            return Err(TidedeskError::Cache {
                message: "redis did not answer PING".to_string(),
                source: None,
            });
        }
        Ok(backend)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TidedeskError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await.map_err(redis_err("GET failed"))?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TidedeskError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(redis_err("SETEX failed"))?;
        Ok(())
    }

    async fn list_push_trim(
        &self,
        key: &str,
        value: &str,
        cap: usize,
        ttl: Duration,
    ) -> Result<(), TidedeskError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .lpush(key, value)
            .await
            .map_err(redis_err("LPUSH failed"))?;
        let _: () = conn
            .ltrim(key, 0, cap as isize - 1)
            .await
            .map_err(redis_err("LTRIM failed"))?;
        let _: () = conn
            .expire(key, ttl.as_secs() as i64)
            .await
            .map_err(redis_err("EXPIRE failed"))?;
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, TidedeskError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        let entries: Vec<String> = conn
            .lrange(key, 0, limit as isize - 1)
            .await
            .map_err(redis_err("LRANGE failed"))?;
        Ok(entries)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), TidedeskError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let _: () = conn
            .del(keys.to_vec())
            .await
            .map_err(redis_err("DEL failed"))?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), TidedeskError> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(redis_err("FLUSHDB failed"))?;
        Ok(())
    }

    async fn ping(&self) -> Result<bool, TidedeskError> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_err("PING failed"))?;
        Ok(pong == "PONG")
    }
}
