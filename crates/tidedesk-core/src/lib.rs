// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tidedesk support backend.
//!
//! This crate provides the error taxonomy and domain types shared by the
//! durable store, the cache layer, and the conversation memory façade.
//! It performs no I/O of its own.

pub mod error;
pub mod types;

pub use error::TidedeskError;
pub use types::{
    ArticleRef, Classification, ClassificationRecord, Conversation, ConversationSnapshot,
    ConversationStatus, ConversationSummary, CustomerContext, InteractionMetadata,
    KnowledgeBaseUsage, Message, Priority, Role, TranscriptEntry,
};
