// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tidedesk.toml` > `~/.config/tidedesk/tidedesk.toml`
//! > `/etc/tidedesk/tidedesk.toml` with environment variable overrides via the
//! `TIDEDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TidedeskConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tidedesk/tidedesk.toml` (system-wide)
/// 3. `~/.config/tidedesk/tidedesk.toml` (user XDG config)
/// 4. `./tidedesk.toml` (local directory)
/// 5. `TIDEDESK_*` environment variables
pub fn load_config() -> Result<TidedeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidedeskConfig::default()))
        .merge(Toml::file("/etc/tidedesk/tidedesk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tidedesk/tidedesk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tidedesk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TidedeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidedeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TidedeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidedeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `TIDEDESK_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("TIDEDESK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: TIDEDESK_CACHE_CONVERSATION_TTL_SECS -> "cache_conversation_ttl_secs"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("memory_", "memory.", 1);
        mapped.into()
    })
}
