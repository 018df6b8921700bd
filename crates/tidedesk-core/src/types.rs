// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Tidedesk support backend.
//!
//! All timestamps are RFC 3339 UTC text with millisecond precision and a
//! `Z` suffix (see [`now_rfc3339`]). One format everywhere means string
//! comparison on timestamp columns equals chronological comparison.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used for every `*_at` field and column.
pub fn now_rfc3339() -> String {
    format_rfc3339(Utc::now())
}

/// Format an explicit instant the same way [`now_rfc3339`] does.
pub fn format_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into a UTC instant.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Minutes elapsed between two stored timestamps (0.0 if either is invalid).
pub fn minutes_between(start: &str, end: &str) -> f64 {
    match (parse_rfc3339(start), parse_rfc3339(end)) {
        (Some(s), Some(e)) => (e - s).num_milliseconds() as f64 / 60_000.0,
        _ => 0.0,
    }
}

/// Lifecycle status of a conversation.
///
/// Transitions are forward-only in practice; re-opening is not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Newly created, awaiting triage.
    Open,
    /// Being actively worked.
    InProgress,
    /// Closed successfully; records `resolved_at`.
    Resolved,
    /// Handed to a human agent.
    Escalated,
    /// Aged out by the archival sweep. Terminal.
    Archived,
}

impl ConversationStatus {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Open => "open",
            ConversationStatus::InProgress => "in_progress",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Escalated => "escalated",
            ConversationStatus::Archived => "archived",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "in_progress" => ConversationStatus::InProgress,
            "resolved" => ConversationStatus::Resolved,
            "escalated" => ConversationStatus::Escalated,
            "archived" => ConversationStatus::Archived,
            _ => ConversationStatus::Open,
        }
    }
}

/// Urgency of a conversation, denormalized from the latest classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Low,
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::User,
        }
    }
}

/// Free-form customer context attached at conversation creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerContext {
    /// Subscription plan name.
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub account_age_months: Option<i64>,
    /// Number of prior support tickets.
    #[serde(default)]
    pub previous_tickets: Option<i64>,
}

/// A knowledge-base article reference with its retrieval relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: String,
    pub title: String,
    pub relevance_score: f64,
}

/// Structured classifier output, consumed verbatim from the external
/// classifier service. Only the fields the state layer touches are modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub priority: Priority,
    /// Customer emotion: positive, neutral, frustrated, angry.
    pub sentiment: String,
    pub requires_human_escalation: bool,
    /// Articles the classifier suggested, with relevance scores.
    #[serde(default)]
    pub articles: Vec<ArticleRef>,
}

/// One entry of a conversation's append-only classification log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub timestamp: String,
    pub classification: Classification,
}

/// A customer support conversation as stored in the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// UUIDv4 identifier.
    pub id: String,
    pub customer_id: String,
    pub status: ConversationStatus,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    /// Invariant: equals the number of persisted messages after any write.
    pub message_count: i64,
    pub escalated: bool,
    pub human_agent_id: Option<String>,
    pub customer_context: Option<CustomerContext>,
    /// Append-only log of past classification snapshots.
    pub classification_history: Vec<ClassificationRecord>,
    /// Ids of knowledge-base articles referenced so far.
    pub articles_referenced: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub resolved_at: Option<String>,
}

impl Conversation {
    /// Build the denormalized, cache-friendly snapshot of this conversation.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            conversation_id: self.id.clone(),
            customer_id: self.customer_id.clone(),
            status: self.status,
            priority: self.priority,
            category: self.category.clone(),
            message_count: self.message_count,
            escalated: self.escalated,
            customer_context: self.customer_context.clone(),
            classification_history: self.classification_history.clone(),
            articles_referenced: self.articles_referenced.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            duration_minutes: minutes_between(&self.created_at, &self.updated_at),
        }
    }
}

/// A single message within a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// Classifier snapshot attached to the message that produced it.
    pub classification_result: Option<Classification>,
    /// Tool/capability names used to produce this message.
    pub tools_used: Vec<String>,
    pub processing_time_ms: Option<i64>,
    pub created_at: String,
}

/// Links a conversation to a knowledge-base article that was consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseUsage {
    pub id: String,
    pub conversation_id: String,
    pub article_id: String,
    pub article_title: String,
    pub relevance_score: f64,
    /// Customer feedback, recorded after the fact.
    pub was_helpful: Option<bool>,
    pub created_at: String,
}

/// Denormalized conversation metadata held in the cache layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub customer_id: String,
    pub status: ConversationStatus,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub message_count: i64,
    pub escalated: bool,
    pub customer_context: Option<CustomerContext>,
    pub classification_history: Vec<ClassificationRecord>,
    pub articles_referenced: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    /// `(updated_at - created_at)` in minutes.
    pub duration_minutes: f64,
}

/// One line of conversation history as returned to callers and kept in the
/// cached message window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub classification_result: Option<Classification>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub processing_time_ms: Option<i64>,
}

impl TranscriptEntry {
    /// Project a stored message into its transcript form.
    pub fn from_message(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            timestamp: msg.created_at.clone(),
            classification_result: msg.classification_result.clone(),
            tools_used: msg.tools_used.clone(),
            processing_time_ms: msg.processing_time_ms,
        }
    }
}

/// Per-interaction metadata supplied by the (external) agent pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionMetadata {
    /// Classifier output for this turn, if any.
    pub classification: Option<Classification>,
    /// Knowledge-base articles consulted while producing the response.
    #[serde(default)]
    pub articles_used: Vec<ArticleRef>,
    #[serde(default)]
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub processing_time_ms: Option<i64>,
}

/// Compact conversation summary for customer history listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub status: ConversationStatus,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub message_count: i64,
    pub created_at: String,
    pub resolved_at: Option<String>,
}
