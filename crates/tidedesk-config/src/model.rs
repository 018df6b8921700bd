// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tidedesk support backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tidedesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidedeskConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cache layer settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Conversation memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "tidedesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "tidedesk.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Cache layer configuration.
///
/// When `url` is unreachable at startup (or `enabled` is false), the cache
/// runs on the bounded in-process fallback with the same TTL semantics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether to attempt the distributed backend at all.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Redis connection URL.
    #[serde(default = "default_cache_url")]
    pub url: String,

    /// Startup connection attempt timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// TTL for conversation snapshots and message windows.
    #[serde(default = "default_conversation_ttl_secs")]
    pub conversation_ttl_secs: u64,

    /// TTL for cached classification results.
    #[serde(default = "default_classification_ttl_secs")]
    pub classification_ttl_secs: u64,

    /// Entry cap for the in-process fallback store.
    #[serde(default = "default_max_fallback_entries")]
    pub max_fallback_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            url: default_cache_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            conversation_ttl_secs: default_conversation_ttl_secs(),
            classification_ttl_secs: default_classification_ttl_secs(),
            max_fallback_entries: default_max_fallback_entries(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_conversation_ttl_secs() -> u64 {
    4 * 60 * 60
}

fn default_classification_ttl_secs() -> u64 {
    30 * 60
}

fn default_max_fallback_entries() -> usize {
    10_000
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Lookback window for continuing an existing conversation.
    #[serde(default = "default_continuity_window_hours")]
    pub continuity_window_hours: i64,

    /// Age threshold for the archival sweep over resolved conversations.
    #[serde(default = "default_archive_after_days")]
    pub archive_after_days: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            continuity_window_hours: default_continuity_window_hours(),
            archive_after_days: default_archive_after_days(),
        }
    }
}

fn default_continuity_window_hours() -> i64 {
    4
}

fn default_archive_after_days() -> i64 {
    90
}
