// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The attach-or-create decision for inbound customer messages.
//!
//! A message continues the customer's most-recently-updated `open` or
//! `in_progress` conversation when its `updated_at` falls inside the
//! continuity window; otherwise a new conversation starts. The lookup and
//! the write are not one atomic unit across processes: two near-simultaneous
//! first messages from the same customer can race and create two
//! conversations. That race is accepted, not hidden -- the deterministic
//! tie-break (`updated_at DESC, id DESC`) keeps subsequent routing stable.

use chrono::Utc;
use tidedesk_core::TidedeskError;
use tidedesk_core::types::{
    self, Conversation, ConversationStatus, CustomerContext, Message, Role,
};
use tidedesk_storage::Database;
use tidedesk_storage::queries::{conversations, interactions};
use tracing::{debug, info};

/// Outcome of resolving an inbound message to a conversation.
#[derive(Debug)]
pub struct Resolution {
    /// The conversation as committed, continued or freshly created.
    pub conversation: Conversation,
    /// The persisted user message carrying the inbound text.
    pub message: Message,
    /// True when an existing conversation was continued.
    pub continued: bool,
}

/// Maps `(customer_id, message)` pairs to conversation ids.
pub struct ContinuityResolver {
    window: chrono::Duration,
}

impl ContinuityResolver {
    /// Build a resolver with the given lookback window.
    pub fn new(window_hours: i64) -> Self {
        Self {
            window: chrono::Duration::hours(window_hours),
        }
    }

    /// Attach the inbound message to a recent active conversation, or create
    /// a new one seeded with it.
    ///
    /// Either way the message is persisted as a `user` Message and
    /// `message_count` stays equal to the persisted row count.
    pub async fn resolve(
        &self,
        db: &Database,
        customer_id: &str,
        initial_message: &str,
        customer_context: Option<CustomerContext>,
    ) -> Result<Resolution, TidedeskError> {
        let now = types::now_rfc3339();
        let cutoff = types::format_rfc3339(Utc::now() - self.window);

        if let Some(existing) = conversations::find_recent_active(db, customer_id, &cutoff).await? {
            let message = build_user_message(&existing.id, initial_message, &now);
            let conversation = interactions::append_user_message(db, &message, &now).await?;
            debug!(
                conversation_id = %conversation.id,
                customer_id,
                "continuing recent conversation"
            );
            return Ok(Resolution {
                conversation,
                message,
                continued: true,
            });
        }

        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            status: ConversationStatus::Open,
            priority: None,
            category: None,
            message_count: 1,
            escalated: false,
            human_agent_id: None,
            customer_context,
            classification_history: vec![],
            articles_referenced: vec![],
            created_at: now.clone(),
            updated_at: now.clone(),
            resolved_at: None,
        };
        let message = build_user_message(&conversation.id, initial_message, &now);
        interactions::create_with_first_message(db, &conversation, &message).await?;
        info!(
            conversation_id = %conversation.id,
            customer_id,
            "started new conversation"
        );
        Ok(Resolution {
            conversation,
            message,
            continued: false,
        })
    }
}

fn build_user_message(conversation_id: &str, content: &str, now: &str) -> Message {
    Message {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: conversation_id.to_string(),
        role: Role::User,
        content: content.to_string(),
        classification_result: None,
        tools_used: vec![],
        processing_time_ms: None,
        created_at: now.to_string(),
    }
}
