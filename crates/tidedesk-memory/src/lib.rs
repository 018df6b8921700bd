// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory façade for the Tidedesk support backend.
//!
//! [`ConversationMemory`] is the only component the rest of the system talks
//! to for reading or writing conversation state. It owns the cache-then-store
//! read pattern and the store-then-cache write pattern:
//!
//! - the durable store is always the write target first; the cache is
//!   updated only after a successful store write (write-through);
//! - reads prefer the cache and fall back to the store, backfilling on miss;
//! - status transitions invalidate the cache entry rather than patching a
//!   potentially stale snapshot.
//!
//! Cache failures never surface here: `tidedesk-cache` swallows them at the
//! source. Store failures always surface so the caller's retry policy can
//! act on them.

pub mod continuity;

use tidedesk_cache::ConversationCache;
use tidedesk_config::model::MemoryConfig;
use tidedesk_core::TidedeskError;
use tidedesk_core::types::{
    self, Conversation, ConversationStatus, ConversationSummary, CustomerContext,
    InteractionMetadata, KnowledgeBaseUsage, Message, Role, TranscriptEntry,
};
use tidedesk_storage::Database;
use tidedesk_storage::queries::{conversations, interactions, kb_usage, messages};
use tracing::{debug, info};

pub use continuity::{ContinuityResolver, Resolution};

/// Snapshot of conversation metadata; re-exported so façade callers need not
/// depend on `tidedesk-core` directly.
pub use tidedesk_core::types::ConversationSnapshot;

/// The single entry point for conversation state.
///
/// Constructed explicitly from a [`Database`] and a [`ConversationCache`] at
/// startup and shared by the request-handling and background-task layers.
pub struct ConversationMemory {
    db: Database,
    cache: ConversationCache,
    resolver: ContinuityResolver,
}

impl ConversationMemory {
    /// Wire the façade from its two collaborators and the memory settings.
    pub fn new(db: Database, cache: ConversationCache, config: &MemoryConfig) -> Self {
        Self {
            db,
            cache,
            resolver: ContinuityResolver::new(config.continuity_window_hours),
        }
    }

    /// The cache component, for callers that also consume the classification
    /// cache (the external classifier pipeline).
    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    /// Continue the customer's recent conversation or start a new one; the
    /// inbound message is persisted either way.
    ///
    /// On creation this also performs the first cache population.
    pub async fn start_or_get_conversation(
        &self,
        customer_id: &str,
        initial_message: &str,
        customer_context: Option<CustomerContext>,
    ) -> Result<Resolution, TidedeskError> {
        let resolution = self
            .resolver
            .resolve(&self.db, customer_id, initial_message, customer_context)
            .await?;
        // Write-through after the committed store write.
        self.cache
            .add_message(
                &resolution.conversation.id,
                &TranscriptEntry::from_message(&resolution.message),
            )
            .await;
        self.cache
            .set_conversation(&resolution.conversation.id, &resolution.conversation.snapshot())
            .await;
        Ok(resolution)
    }

    /// Persist one full user/assistant interaction and refresh the cache.
    ///
    /// The user message, the assistant reply, the `message_count` bump, the
    /// classification-history append, the denormalized field overwrite, and
    /// the knowledge-base usage rows commit or roll back as one transaction.
    /// The user row is skipped when it is already the conversation's latest
    /// persisted message (the resolver stores the inbound message up front).
    pub async fn add_interaction(
        &self,
        conversation_id: &str,
        user_message: &str,
        agent_response: &str,
        metadata: InteractionMetadata,
    ) -> Result<Conversation, TidedeskError> {
        let now = types::now_rfc3339();
        let user = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: Role::User,
            content: user_message.to_string(),
            classification_result: None,
            tools_used: vec![],
            processing_time_ms: None,
            created_at: now.clone(),
        };
        let assistant = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: Role::Assistant,
            content: agent_response.to_string(),
            classification_result: metadata.classification.clone(),
            tools_used: metadata.tools_used.clone(),
            processing_time_ms: metadata.processing_time_ms,
            created_at: now.clone(),
        };

        let outcome = interactions::record_interaction(
            &self.db,
            &user,
            &assistant,
            metadata.classification.as_ref(),
            &metadata.articles_used,
            &now,
        )
        .await?;

        // Write-through: the store committed, now mirror into the cache.
        if outcome.user_inserted {
            self.cache
                .add_message(conversation_id, &TranscriptEntry::from_message(&user))
                .await;
        }
        self.cache
            .add_message(conversation_id, &TranscriptEntry::from_message(&assistant))
            .await;
        self.cache
            .set_conversation(conversation_id, &outcome.conversation.snapshot())
            .await;

        debug!(
            conversation_id,
            message_count = outcome.conversation.message_count,
            "interaction recorded"
        );
        Ok(outcome.conversation)
    }

    /// Conversation history in chronological order, capped at `limit`.
    ///
    /// Cache-first: a populated window is reversed into chronological order.
    /// On miss, reads the store ascending and backfills the window
    /// oldest-first so it ends newest-first.
    pub async fn get_conversation_history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<TranscriptEntry>, TidedeskError> {
        if let Some(mut cached) = self.cache.get_recent_messages(conversation_id, limit).await {
            cached.reverse();
            return Ok(cached);
        }

        let stored = messages::get_for_conversation(&self.db, conversation_id, Some(limit as i64))
            .await?;
        let history: Vec<TranscriptEntry> =
            stored.iter().map(TranscriptEntry::from_message).collect();
        for entry in &history {
            self.cache.add_message(conversation_id, entry).await;
        }
        Ok(history)
    }

    /// Full conversation metadata snapshot, or `None` for an unknown id.
    ///
    /// Cache-first; on miss reads the store, computes `duration_minutes`,
    /// and populates the cache.
    pub async fn get_conversation_context(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationSnapshot>, TidedeskError> {
        if let Some(snapshot) = self.cache.get_conversation(conversation_id).await {
            return Ok(Some(snapshot));
        }
        let Some(conversation) = conversations::get_conversation(&self.db, conversation_id).await?
        else {
            return Ok(None);
        };
        let snapshot = conversation.snapshot();
        self.cache.set_conversation(conversation_id, &snapshot).await;
        Ok(Some(snapshot))
    }

    /// Apply a status transition and drop the cache entry.
    ///
    /// `resolved` records `resolved_at`; `escalated` sets the escalation
    /// flag and the assigned human agent. The cache entry is invalidated,
    /// not patched: the façade does not trust itself to incrementally update
    /// a potentially stale snapshot across a state transition.
    pub async fn update_conversation_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
        human_agent_id: Option<&str>,
    ) -> Result<(), TidedeskError> {
        let now = types::now_rfc3339();
        conversations::update_status(&self.db, conversation_id, status, human_agent_id, &now)
            .await?;
        self.cache.invalidate_conversation(conversation_id).await;
        info!(
            conversation_id,
            status = status.as_str(),
            "conversation status updated"
        );
        Ok(())
    }

    /// A customer's past conversations as summaries, most recent first.
    ///
    /// Always reads the durable store; this listing is not cached.
    pub async fn get_customer_conversation_history(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, TidedeskError> {
        conversations::list_for_customer(&self.db, customer_id, limit as i64).await
    }

    /// Archive resolved conversations older than `days_old` days.
    ///
    /// Archival is the system's only form of deletion: a status transition,
    /// never a row removal. Affected cache entries are invalidated. Returns
    /// the number of conversations archived.
    pub async fn archive_stale(&self, days_old: i64) -> Result<usize, TidedeskError> {
        let cutoff =
            types::format_rfc3339(chrono::Utc::now() - chrono::Duration::days(days_old));
        let now = types::now_rfc3339();
        let archived = conversations::archive_older_than(&self.db, &cutoff, &now).await?;
        for conversation_id in &archived {
            self.cache.invalidate_conversation(conversation_id).await;
        }
        if !archived.is_empty() {
            info!(count = archived.len(), "archived stale conversations");
        }
        Ok(archived.len())
    }

    /// Knowledge-base usage recorded for a conversation, oldest first.
    pub async fn get_article_usage(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<KnowledgeBaseUsage>, TidedeskError> {
        kb_usage::list_for_conversation(&self.db, conversation_id).await
    }

    /// Record customer feedback on whether a consulted article helped.
    pub async fn record_article_feedback(
        &self,
        usage_id: &str,
        was_helpful: bool,
    ) -> Result<(), TidedeskError> {
        kb_usage::record_feedback(&self.db, usage_id, was_helpful).await
    }
}
