// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tidedesk support backend.

use thiserror::Error;

/// The primary error type used across Tidedesk crates.
#[derive(Debug, Error)]
pub enum TidedeskError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (connection, query failure, serialization).
    ///
    /// Always fatal to the calling operation; the transaction is rolled back
    /// and the error surfaces to the caller's retry policy.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Cache backend errors (connection failure, command failure, bad payload).
    ///
    /// Never escapes the cache layer: every cache operation degrades to a
    /// miss or a logged no-op instead of returning this to callers.
    #[error("cache error: {message}")]
    Cache {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The referenced conversation does not exist in the durable store.
    #[error("conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidedeskError {
    /// Wrap any error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TidedeskError::Storage {
            source: Box::new(source),
        }
    }

    /// Wrap any error as a cache failure with context.
    pub fn cache<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TidedeskError::Cache {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
