// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composite transactional operations spanning conversations, messages, and
//! knowledge-base usage.
//!
//! Each operation here is one SQLite transaction: the message inserts and the
//! conversation metadata update commit or roll back together. This is where
//! the `message_count == COUNT(messages)` invariant is maintained.

use rusqlite::{OptionalExtension, params};
use tidedesk_core::TidedeskError;
use tidedesk_core::types::{
    ArticleRef, Classification, ClassificationRecord, Conversation, KnowledgeBaseUsage, Message,
};

use crate::database::{Database, map_tr_err};
use crate::queries::conversations::{
    CONVERSATION_COLUMNS, insert_conversation_tx, row_to_conversation,
};
use crate::queries::kb_usage::insert_usage_tx;
use crate::queries::messages::insert_message_tx;

/// Result of [`record_interaction`].
#[derive(Debug)]
pub struct InteractionOutcome {
    /// False when the user row was skipped because it was already the
    /// conversation's latest persisted message.
    pub user_inserted: bool,
    /// The conversation as committed, for write-through snapshot refresh.
    pub conversation: Conversation,
}

fn json_string<T: serde::Serialize>(value: &T) -> Result<String, tokio_rusqlite::Error> {
    serde_json::to_string(value).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))
}

fn select_conversation_tx(
    conn: &rusqlite::Connection,
    id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
    ))?;
    stmt.query_row(params![id], row_to_conversation).optional()
}

/// Create a conversation together with its first user message.
///
/// The caller seeds `message_count = 1` on the conversation; both rows land
/// in one transaction so a half-created conversation can never be observed.
pub async fn create_with_first_message(
    db: &Database,
    conversation: &Conversation,
    first_message: &Message,
) -> Result<(), TidedeskError> {
    let conversation = conversation.clone();
    let first_message = first_message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            insert_conversation_tx(&tx, &conversation)?;
            insert_message_tx(&tx, &first_message)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Append a user message to an existing conversation, bumping
/// `message_count` and `updated_at` in the same transaction.
///
/// Returns the conversation as committed. Errors with the typed not-found
/// when the conversation row has vanished.
pub async fn append_user_message(
    db: &Database,
    message: &Message,
    now: &str,
) -> Result<Conversation, TidedeskError> {
    let conversation_id = message.conversation_id.clone();
    let message = message.clone();
    let now = now.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            insert_message_tx(&tx, &message)?;
            tx.execute(
                "UPDATE conversations
                 SET message_count = message_count + 1, updated_at = ?1
                 WHERE id = ?2",
                params![now, message.conversation_id],
            )?;
            let conversation = select_conversation_tx(&tx, &message.conversation_id)?;
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)?;
    updated.ok_or(TidedeskError::ConversationNotFound { conversation_id })
}

/// Persist one full user/assistant interaction.
///
/// In a single transaction:
/// - inserts the user message unless the conversation's latest message is
///   already an identical user row (the continuity resolver persists the
///   inbound message up front);
/// - inserts the assistant message;
/// - increments `message_count` by the rows actually inserted and touches
///   `updated_at`;
/// - when a classification is supplied, appends it to
///   `classification_history` and overwrites the denormalized
///   `category`/`priority`/`escalated` fields (last write wins);
/// - records knowledge-base usage rows and extends `articles_referenced`
///   with ids not already present.
pub async fn record_interaction(
    db: &Database,
    user_message: &Message,
    assistant_message: &Message,
    classification: Option<&Classification>,
    articles: &[ArticleRef],
    now: &str,
) -> Result<InteractionOutcome, TidedeskError> {
    let conversation_id = user_message.conversation_id.clone();
    let user_message = user_message.clone();
    let assistant_message = assistant_message.clone();
    let classification = classification.cloned();
    let articles = articles.to_vec();
    let now = now.to_string();

    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let Some(mut conversation) =
                select_conversation_tx(&tx, &user_message.conversation_id)?
            else {
                return Ok(None);
            };

            // Skip the user row when it is already the latest persisted message.
            let latest: Option<(String, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT role, content FROM messages WHERE conversation_id = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT 1",
                )?;
                stmt.query_row(params![conversation.id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .optional()?
            };
            let user_inserted = !matches!(
                &latest,
                Some((role, content)) if role == "user" && *content == user_message.content
            );
            if user_inserted {
                insert_message_tx(&tx, &user_message)?;
            }
            insert_message_tx(&tx, &assistant_message)?;

            conversation.message_count += if user_inserted { 2 } else { 1 };
            conversation.updated_at = now.clone();

            if let Some(ref classification) = classification {
                conversation
                    .classification_history
                    .push(ClassificationRecord {
                        timestamp: now.clone(),
                        classification: classification.clone(),
                    });
                conversation.category = Some(classification.category.clone());
                conversation.priority = Some(classification.priority);
                conversation.escalated = classification.requires_human_escalation;
            }
            for article in &articles {
                if !conversation.articles_referenced.contains(&article.id) {
                    conversation.articles_referenced.push(article.id.clone());
                }
            }

            let classification_history = json_string(&conversation.classification_history)?;
            let articles_referenced = json_string(&conversation.articles_referenced)?;
            tx.execute(
                "UPDATE conversations
                 SET message_count = ?1, updated_at = ?2, classification_history = ?3,
                     articles_referenced = ?4, category = ?5, priority = ?6, escalated = ?7
                 WHERE id = ?8",
                params![
                    conversation.message_count,
                    conversation.updated_at,
                    classification_history,
                    articles_referenced,
                    conversation.category,
                    conversation.priority.map(|p| p.as_str()),
                    conversation.escalated,
                    conversation.id,
                ],
            )?;

            for article in &articles {
                let usage = KnowledgeBaseUsage {
                    id: uuid::Uuid::new_v4().to_string(),
                    conversation_id: conversation.id.clone(),
                    article_id: article.id.clone(),
                    article_title: article.title.clone(),
                    relevance_score: article.relevance_score,
                    was_helpful: None,
                    created_at: now.clone(),
                };
                insert_usage_tx(&tx, &usage)?;
            }

            tx.commit()?;
            Ok(Some(InteractionOutcome {
                user_inserted,
                conversation,
            }))
        })
        .await
        .map_err(map_tr_err)?;

    outcome.ok_or(TidedeskError::ConversationNotFound { conversation_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{conversations, kb_usage, messages};
    use tidedesk_core::types::{ConversationStatus, Priority, Role};

    fn make_conversation(id: &str, customer_id: &str, timestamp: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            status: ConversationStatus::Open,
            priority: None,
            category: None,
            message_count: 1,
            escalated: false,
            human_agent_id: None,
            customer_context: None,
            classification_history: vec![],
            articles_referenced: vec![],
            created_at: timestamp.to_string(),
            updated_at: timestamp.to_string(),
            resolved_at: None,
        }
    }

    fn make_msg(id: &str, conversation_id: &str, role: Role, content: &str, ts: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            classification_result: None,
            tools_used: vec![],
            processing_time_ms: None,
            created_at: ts.to_string(),
        }
    }

    fn make_classification(escalate: bool) -> Classification {
        Classification {
            category: "billing".to_string(),
            priority: Priority::High,
            sentiment: "frustrated".to_string(),
            requires_human_escalation: escalate,
            articles: vec![],
        }
    }

    async fn setup_conversation(db: &Database) {
        let conv = make_conversation("conv-1", "cust-1", "2026-01-01T10:00:00.000Z");
        let first = make_msg(
            "m-first",
            "conv-1",
            Role::User,
            "payment declined",
            "2026-01-01T10:00:00.000Z",
        );
        create_with_first_message(db, &conv, &first).await.unwrap();
    }

    #[tokio::test]
    async fn create_with_first_message_seeds_count_of_one() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        let conv = conversations::get_conversation(&db, "conv-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.message_count, 1);
        assert_eq!(
            messages::count_for_conversation(&db, "conv-1").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn append_user_message_bumps_count_and_updated_at() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        let msg = make_msg(
            "m2",
            "conv-1",
            Role::User,
            "still failing",
            "2026-01-01T10:05:00.000Z",
        );
        let conv = append_user_message(&db, &msg, "2026-01-01T10:05:00.000Z")
            .await
            .unwrap();
        assert_eq!(conv.message_count, 2);
        assert_eq!(conv.updated_at, "2026-01-01T10:05:00.000Z");
        assert_eq!(
            messages::count_for_conversation(&db, "conv-1").await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn record_interaction_skips_already_persisted_user_message() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        // The resolver already persisted "payment declined" as the latest
        // message; the interaction must only add the assistant row.
        let user = make_msg(
            "m-dup",
            "conv-1",
            Role::User,
            "payment declined",
            "2026-01-01T10:06:00.000Z",
        );
        let assistant = make_msg(
            "m-a1",
            "conv-1",
            Role::Assistant,
            "Checking your account now.",
            "2026-01-01T10:06:01.000Z",
        );
        let outcome = record_interaction(&db, &user, &assistant, None, &[], "2026-01-01T10:06:01.000Z")
            .await
            .unwrap();
        assert!(!outcome.user_inserted);
        assert_eq!(outcome.conversation.message_count, 2);
        assert_eq!(
            messages::count_for_conversation(&db, "conv-1").await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn record_interaction_inserts_both_rows_when_user_is_new() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        let user = make_msg(
            "m-u2",
            "conv-1",
            Role::User,
            "error code 402 now",
            "2026-01-01T10:10:00.000Z",
        );
        let assistant = make_msg(
            "m-a2",
            "conv-1",
            Role::Assistant,
            "402 means authentication failed.",
            "2026-01-01T10:10:01.000Z",
        );
        let outcome = record_interaction(&db, &user, &assistant, None, &[], "2026-01-01T10:10:01.000Z")
            .await
            .unwrap();
        assert!(outcome.user_inserted);
        assert_eq!(outcome.conversation.message_count, 3);
        assert_eq!(
            messages::count_for_conversation(&db, "conv-1").await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn record_interaction_denormalizes_latest_classification() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        let user = make_msg("m-u2", "conv-1", Role::User, "help", "2026-01-01T10:10:00.000Z");
        let assistant = make_msg(
            "m-a2",
            "conv-1",
            Role::Assistant,
            "on it",
            "2026-01-01T10:10:01.000Z",
        );
        let classification = make_classification(true);
        let outcome = record_interaction(
            &db,
            &user,
            &assistant,
            Some(&classification),
            &[],
            "2026-01-01T10:10:01.000Z",
        )
        .await
        .unwrap();

        let conv = outcome.conversation;
        assert_eq!(conv.category.as_deref(), Some("billing"));
        assert_eq!(conv.priority, Some(Priority::High));
        assert!(conv.escalated);
        assert_eq!(conv.classification_history.len(), 1);
        assert_eq!(
            conv.classification_history[0].timestamp,
            "2026-01-01T10:10:01.000Z"
        );
    }

    #[tokio::test]
    async fn record_interaction_tracks_article_usage() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        let user = make_msg("m-u2", "conv-1", Role::User, "help", "2026-01-01T10:10:00.000Z");
        let assistant = make_msg(
            "m-a2",
            "conv-1",
            Role::Assistant,
            "see the payments guide",
            "2026-01-01T10:10:01.000Z",
        );
        let articles = vec![
            ArticleRef {
                id: "kb-1".to_string(),
                title: "Payment declines".to_string(),
                relevance_score: 0.9,
            },
            ArticleRef {
                id: "kb-2".to_string(),
                title: "Stripe setup".to_string(),
                relevance_score: 0.7,
            },
        ];
        let outcome = record_interaction(
            &db,
            &user,
            &assistant,
            None,
            &articles,
            "2026-01-01T10:10:01.000Z",
        )
        .await
        .unwrap();
        assert_eq!(
            outcome.conversation.articles_referenced,
            vec!["kb-1".to_string(), "kb-2".to_string()]
        );

        let usages = kb_usage::list_for_conversation(&db, "conv-1").await.unwrap();
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].article_id, "kb-1");

        // A repeat reference adds a usage row but not a duplicate id.
        let user2 = make_msg("m-u3", "conv-1", Role::User, "more", "2026-01-01T10:20:00.000Z");
        let assistant2 = make_msg(
            "m-a3",
            "conv-1",
            Role::Assistant,
            "same guide",
            "2026-01-01T10:20:01.000Z",
        );
        let outcome = record_interaction(
            &db,
            &user2,
            &assistant2,
            None,
            &articles[..1],
            "2026-01-01T10:20:01.000Z",
        )
        .await
        .unwrap();
        assert_eq!(outcome.conversation.articles_referenced.len(), 2);
        let usages = kb_usage::list_for_conversation(&db, "conv-1").await.unwrap();
        assert_eq!(usages.len(), 3);
    }

    #[tokio::test]
    async fn record_interaction_rolls_back_as_a_unit() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;

        let user = make_msg(
            "m-u2",
            "conv-1",
            Role::User,
            "new question",
            "2026-01-01T10:10:00.000Z",
        );
        // Same primary key as the user row: the assistant insert fails after
        // the user insert succeeded, and the whole transaction must unwind.
        let assistant = make_msg(
            "m-u2",
            "conv-1",
            Role::Assistant,
            "reply",
            "2026-01-01T10:10:01.000Z",
        );
        let result =
            record_interaction(&db, &user, &assistant, None, &[], "2026-01-01T10:10:01.000Z").await;
        assert!(result.is_err());

        // Nothing from the failed call may persist.
        assert_eq!(
            messages::count_for_conversation(&db, "conv-1").await.unwrap(),
            1
        );
        let conv = conversations::get_conversation(&db, "conv-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.message_count, 1);
        assert_eq!(conv.updated_at, "2026-01-01T10:00:00.000Z");
    }

    #[tokio::test]
    async fn record_interaction_unknown_conversation_is_typed_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let user = make_msg("m-u", "ghost", Role::User, "hello", "2026-01-01T10:10:00.000Z");
        let assistant = make_msg(
            "m-a",
            "ghost",
            Role::Assistant,
            "hi",
            "2026-01-01T10:10:01.000Z",
        );
        let err = record_interaction(&db, &user, &assistant, None, &[], "2026-01-01T10:10:01.000Z")
            .await
            .unwrap_err();
        assert!(matches!(err, TidedeskError::ConversationNotFound { .. }));
    }

    #[tokio::test]
    async fn cascade_delete_removes_messages_and_usage() {
        let db = Database::open_in_memory().await.unwrap();
        setup_conversation(&db).await;
        let user = make_msg("m-u2", "conv-1", Role::User, "q", "2026-01-01T10:10:00.000Z");
        let assistant = make_msg("m-a2", "conv-1", Role::Assistant, "a", "2026-01-01T10:10:01.000Z");
        let articles = vec![ArticleRef {
            id: "kb-1".to_string(),
            title: "Guide".to_string(),
            relevance_score: 0.5,
        }];
        record_interaction(&db, &user, &assistant, None, &articles, "2026-01-01T10:10:01.000Z")
            .await
            .unwrap();

        assert!(conversations::delete_conversation(&db, "conv-1").await.unwrap());
        assert_eq!(
            messages::count_for_conversation(&db, "conv-1").await.unwrap(),
            0
        );
        assert!(
            kb_usage::list_for_conversation(&db, "conv-1")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
