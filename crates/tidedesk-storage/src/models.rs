// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `tidedesk-core::types` so the cache layer and
//! the memory façade share them. This module re-exports them for convenience
//! within the storage crate.

pub use tidedesk_core::types::{
    Conversation, ConversationStatus, ConversationSummary, KnowledgeBaseUsage, Message, Priority,
    Role,
};
