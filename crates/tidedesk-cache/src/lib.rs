// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort cache layer for the Tidedesk support backend.
//!
//! Holds conversation snapshots, sliding windows of recent messages, and
//! classification results keyed by content hash. Backed by Redis when
//! reachable at startup, otherwise by a bounded in-process map with the same
//! TTL semantics ([`memory::MemoryBackend`]).
//!
//! Every operation is best-effort: backend failures degrade to a miss on
//! reads and a logged no-op on writes, and never propagate to callers. The
//! durable store remains the source of truth; everything here is an
//! expendable copy.

pub mod backend;
pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tidedesk_config::model::CacheConfig;
use tidedesk_core::types::{Classification, ConversationSnapshot, TranscriptEntry};
use tracing::{debug, info, warn};

use crate::backend::CacheBackend;
use crate::memory::MemoryBackend;
use crate::redis::RedisBackend;

/// Sliding-window cap on cached messages per conversation.
pub const MESSAGE_WINDOW: usize = 50;

fn conversation_key(conversation_id: &str) -> String {
    format!("conv:{conversation_id}")
}

fn messages_key(conversation_id: &str) -> String {
    format!("messages:{conversation_id}")
}

fn classification_key(hash: &str) -> String {
    format!("classification:{hash}")
}

/// The cache component callers construct once at startup and share.
///
/// Wraps whichever [`CacheBackend`] was selected; callers never branch on
/// which one is active.
pub struct ConversationCache {
    backend: Arc<dyn CacheBackend>,
    conversation_ttl: Duration,
    classification_ttl: Duration,
}

impl ConversationCache {
    /// Select a backend and build the cache.
    ///
    /// Tries Redis once (bounded by the configured timeout) when enabled;
    /// any failure falls back to the in-process store. The fallback is
    /// never an error.
    pub async fn connect(config: &CacheConfig) -> Self {
        if config.enabled {
            let timeout = Duration::from_millis(config.connect_timeout_ms);
            match RedisBackend::connect(&config.url, timeout).await {
                Ok(backend) => {
                    info!("connected to redis cache");
                    return Self::with_backend(Arc::new(backend), config);
                }
                Err(e) => {
                    warn!(error = %e, "redis unavailable, using in-process cache");
                }
            }
        } else {
            info!("distributed cache disabled, using in-process cache");
        }
        Self::with_backend(
            Arc::new(MemoryBackend::new(config.max_fallback_entries)),
            config,
        )
    }

    /// Build the cache over an explicit backend. Used by `connect` and by
    /// tests that want the in-process store directly.
    pub fn with_backend(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            conversation_ttl: Duration::from_secs(config.conversation_ttl_secs),
            classification_ttl: Duration::from_secs(config.classification_ttl_secs),
        }
    }

    /// Name of the active backend, for diagnostics.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Content hash for classification caching: SHA-256 of the trimmed
    /// message text, hex-encoded. Stable and independent of context fields.
    pub fn message_hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.trim().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Cached conversation snapshot, or `None` on miss, expiry, backend
    /// failure, or an undecodable payload.
    pub async fn get_conversation(&self, conversation_id: &str) -> Option<ConversationSnapshot> {
        match self.backend.get(&conversation_key(conversation_id)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(conversation_id, error = %e, "discarding undecodable cached snapshot");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(conversation_id, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Store/overwrite a conversation snapshot with the conversation TTL.
    pub async fn set_conversation(&self, conversation_id: &str, snapshot: &ConversationSnapshot) {
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(conversation_id, error = %e, "snapshot serialization failed");
                return;
            }
        };
        if let Err(e) = self
            .backend
            .set_ex(&conversation_key(conversation_id), &raw, self.conversation_ttl)
            .await
        {
            warn!(conversation_id, error = %e, "cache write failed");
        }
    }

    /// Most recent messages, newest first, capped at `limit`. `None` when
    /// the window is empty or unavailable.
    pub async fn get_recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Option<Vec<TranscriptEntry>> {
        let raw = match self
            .backend
            .list_range(&messages_key(conversation_id), limit)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(conversation_id, error = %e, "cache window read failed");
                return None;
            }
        };
        let entries: Vec<TranscriptEntry> = raw
            .iter()
            .filter_map(|item| match serde_json::from_str(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(conversation_id, error = %e, "skipping undecodable window entry");
                    None
                }
            })
            .collect();
        if entries.is_empty() { None } else { Some(entries) }
    }

    /// Prepend a message to the window, truncate to [`MESSAGE_WINDOW`], and
    /// refresh the TTL.
    pub async fn add_message(&self, conversation_id: &str, entry: &TranscriptEntry) {
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(conversation_id, error = %e, "window entry serialization failed");
                return;
            }
        };
        if let Err(e) = self
            .backend
            .list_push_trim(
                &messages_key(conversation_id),
                &raw,
                MESSAGE_WINDOW,
                self.conversation_ttl,
            )
            .await
        {
            warn!(conversation_id, error = %e, "cache window write failed");
        }
    }

    /// Cache a classification result under its content hash.
    pub async fn cache_classification(&self, message_hash: &str, classification: &Classification) {
        let raw = match serde_json::to_string(classification) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(message_hash, error = %e, "classification serialization failed");
                return;
            }
        };
        if let Err(e) = self
            .backend
            .set_ex(&classification_key(message_hash), &raw, self.classification_ttl)
            .await
        {
            warn!(message_hash, error = %e, "classification cache write failed");
        }
    }

    /// Look up a previously cached classification by content hash.
    pub async fn get_cached_classification(&self, message_hash: &str) -> Option<Classification> {
        match self.backend.get(&classification_key(message_hash)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(message_hash, error = %e, "classification cache read failed");
                None
            }
        }
    }

    /// Drop both the snapshot and the message window for a conversation.
    ///
    /// Called whenever durable state changes in a way the cache cannot
    /// incrementally reflect (status transitions).
    pub async fn invalidate_conversation(&self, conversation_id: &str) {
        let keys = vec![
            conversation_key(conversation_id),
            messages_key(conversation_id),
        ];
        if let Err(e) = self.backend.delete(&keys).await {
            warn!(conversation_id, error = %e, "cache invalidation failed");
        }
    }

    /// Clear the entire cache. Test and debug tooling only.
    pub async fn flush(&self) {
        if let Err(e) = self.backend.flush().await {
            warn!(error = %e, "cache flush failed");
        }
    }

    /// Liveness probe; always true when running on the in-process fallback.
    pub async fn ping(&self) -> bool {
        self.backend.ping().await.unwrap_or(false)
    }
}
