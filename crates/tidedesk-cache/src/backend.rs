// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cache capability boundary.
//!
//! Two implementations exist: the Redis-backed [`crate::redis::RedisBackend`]
//! and the in-process [`crate::memory::MemoryBackend`] fallback. One of them
//! is selected at startup; callers above [`crate::ConversationCache`] never
//! branch on which is active.

use std::time::Duration;

use async_trait::async_trait;
use tidedesk_core::TidedeskError;

/// Low-level cache operations shared by both backends.
///
/// Errors returned here never reach façade callers: `ConversationCache`
/// degrades every failure to a miss or a logged no-op.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Fetch a string value, `None` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, TidedeskError>;

    /// Store a string value with a TTL, overwriting any previous value.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), TidedeskError>;

    /// Prepend to a list, truncate it to the most recent `cap` entries, and
    /// refresh its TTL.
    ///
    /// On Redis this is a push+trim+expire sequence, not a transaction; the
    /// brief inconsistency window is accepted.
    async fn list_push_trim(
        &self,
        key: &str,
        value: &str,
        cap: usize,
        ttl: Duration,
    ) -> Result<(), TidedeskError>;

    /// Read up to `limit` list entries, most recent first. An absent or
    /// expired list reads as empty.
    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, TidedeskError>;

    /// Remove the given keys.
    async fn delete(&self, keys: &[String]) -> Result<(), TidedeskError>;

    /// Drop everything. Test and debug tooling only.
    async fn flush(&self) -> Result<(), TidedeskError>;

    /// Liveness probe. The in-process fallback always reports true.
    async fn ping(&self) -> Result<bool, TidedeskError>;
}
