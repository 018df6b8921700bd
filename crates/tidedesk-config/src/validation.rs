// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, positive TTLs, and URL schemes.

use thiserror::Error;

use crate::model::TidedeskConfig;

/// A single configuration problem, rendered one per line at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A semantic validation failure after successful deserialization.
    #[error("invalid configuration: {message}")]
    Validation { message: String },

    /// A parse/deserialization failure from the underlying loader.
    #[error("failed to load configuration: {message}")]
    Load { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TidedeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.cache.enabled {
        let url = config.cache.url.trim();
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            errors.push(ConfigError::Validation {
                message: format!("cache.url `{url}` must be a redis:// or rediss:// URL"),
            });
        }
    }

    if config.cache.conversation_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.conversation_ttl_secs must be positive".to_string(),
        });
    }

    if config.cache.classification_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.classification_ttl_secs must be positive".to_string(),
        });
    }

    if config.cache.max_fallback_entries == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.max_fallback_entries must be positive".to_string(),
        });
    }

    if config.memory.continuity_window_hours <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.continuity_window_hours must be positive, got {}",
                config.memory.continuity_window_hours
            ),
        });
    }

    if config.memory.archive_after_days <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.archive_after_days must be positive, got {}",
                config.memory.archive_after_days
            ),
        });
    }

    let level = config.service.log_level.as_str();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level must be one of trace/debug/info/warn/error, got `{level}`"
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Print collected configuration errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("tidedesk: {error}");
    }
}
