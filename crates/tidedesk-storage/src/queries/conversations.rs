// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD and lookup operations.

use rusqlite::{OptionalExtension, params};
use tidedesk_core::types::{
    Conversation, ConversationStatus, ConversationSummary, Priority,
};
use tidedesk_core::TidedeskError;

use crate::database::{Database, map_tr_err};

/// Column list shared by every query that materializes a full row.
pub(crate) const CONVERSATION_COLUMNS: &str = "id, customer_id, status, priority, category, \
     message_count, escalated, human_agent_id, customer_context, \
     classification_history, articles_referenced, created_at, updated_at, resolved_at";

/// Convert a rusqlite row (selected with [`CONVERSATION_COLUMNS`]) into a
/// [`Conversation`]. JSON columns fall back to empty values when unreadable.
pub(crate) fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    let status: String = row.get(2)?;
    let priority: Option<String> = row.get(3)?;
    let customer_context: Option<String> = row.get(8)?;
    let classification_history: String = row.get(9)?;
    let articles_referenced: String = row.get(10)?;
    Ok(Conversation {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        status: ConversationStatus::from_str_value(&status),
        priority: priority.map(|p| Priority::from_str_value(&p)),
        category: row.get(4)?,
        message_count: row.get(5)?,
        escalated: row.get(6)?,
        human_agent_id: row.get(7)?,
        customer_context: customer_context.and_then(|s| serde_json::from_str(&s).ok()),
        classification_history: serde_json::from_str(&classification_history).unwrap_or_default(),
        articles_referenced: serde_json::from_str(&articles_referenced).unwrap_or_default(),
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        resolved_at: row.get(13)?,
    })
}

/// Insert a conversation row inside an existing transaction.
pub(crate) fn insert_conversation_tx(
    conn: &rusqlite::Connection,
    conversation: &Conversation,
) -> rusqlite::Result<()> {
    let customer_context = conversation
        .customer_context
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let classification_history = serde_json::to_string(&conversation.classification_history)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let articles_referenced = serde_json::to_string(&conversation.articles_referenced)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO conversations (id, customer_id, status, priority, category, \
         message_count, escalated, human_agent_id, customer_context, \
         classification_history, articles_referenced, created_at, updated_at, resolved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            conversation.id,
            conversation.customer_id,
            conversation.status.as_str(),
            conversation.priority.map(|p| p.as_str()),
            conversation.category,
            conversation.message_count,
            conversation.escalated,
            conversation.human_agent_id,
            customer_context,
            classification_history,
            articles_referenced,
            conversation.created_at,
            conversation.updated_at,
            conversation.resolved_at,
        ],
    )?;
    Ok(())
}

/// Create a new conversation row.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), TidedeskError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| {
            insert_conversation_tx(conn, &conversation)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, TidedeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            let conversation = stmt
                .query_row(params![id], row_to_conversation)
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Find the customer's most-recently-updated active conversation inside the
/// continuity window.
///
/// Active means status `open` or `in_progress`; `cutoff` is the oldest
/// `updated_at` still eligible. Ties on `updated_at` break by descending id
/// so routing is reproducible.
pub async fn find_recent_active(
    db: &Database,
    customer_id: &str,
    cutoff: &str,
) -> Result<Option<Conversation>, TidedeskError> {
    let customer_id = customer_id.to_string();
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE customer_id = ?1
                   AND status IN ('open', 'in_progress')
                   AND updated_at > ?2
                 ORDER BY updated_at DESC, id DESC
                 LIMIT 1"
            ))?;
            let conversation = stmt
                .query_row(params![customer_id, cutoff], row_to_conversation)
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// List a customer's conversations as summaries, most recent first.
pub async fn list_for_customer(
    db: &Database,
    customer_id: &str,
    limit: i64,
) -> Result<Vec<ConversationSummary>, TidedeskError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, status, category, priority, message_count, created_at, resolved_at
                 FROM conversations WHERE customer_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![customer_id, limit], |row| {
                let status: String = row.get(1)?;
                let priority: Option<String> = row.get(3)?;
                Ok(ConversationSummary {
                    conversation_id: row.get(0)?,
                    status: ConversationStatus::from_str_value(&status),
                    category: row.get(2)?,
                    priority: priority.map(|p| Priority::from_str_value(&p)),
                    message_count: row.get(4)?,
                    created_at: row.get(5)?,
                    resolved_at: row.get(6)?,
                })
            })?;
            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row?);
            }
            Ok(summaries)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a status transition.
///
/// Transitioning to `resolved` records `resolved_at`; transitioning to
/// `escalated` sets the escalation flag and the assigned human agent.
/// Returns the typed not-found error when the conversation does not exist.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
    human_agent_id: Option<&str>,
    now: &str,
) -> Result<(), TidedeskError> {
    let conversation_id = id.to_string();
    let id = conversation_id.clone();
    let human_agent_id = human_agent_id.map(|s| s.to_string());
    let now = now.to_string();
    let rows = db
        .connection()
        .call(move |conn| {
            let rows = match status {
                ConversationStatus::Resolved => conn.execute(
                    "UPDATE conversations
                     SET status = ?1, updated_at = ?2, resolved_at = ?2
                     WHERE id = ?3",
                    params![status.as_str(), now, id],
                )?,
                ConversationStatus::Escalated => conn.execute(
                    "UPDATE conversations
                     SET status = ?1, updated_at = ?2, escalated = 1, human_agent_id = ?3
                     WHERE id = ?4",
                    params![status.as_str(), now, human_agent_id, id],
                )?,
                _ => conn.execute(
                    "UPDATE conversations SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status.as_str(), now, id],
                )?,
            };
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;
    if rows == 0 {
        return Err(TidedeskError::ConversationNotFound { conversation_id });
    }
    Ok(())
}

/// Transition resolved conversations older than `cutoff` to `archived`.
///
/// Returns the affected ids so callers can drop their cache entries.
pub async fn archive_older_than(
    db: &Database,
    cutoff: &str,
    now: &str,
) -> Result<Vec<String>, TidedeskError> {
    let cutoff = cutoff.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM conversations
                     WHERE status = 'resolved' AND resolved_at IS NOT NULL AND resolved_at < ?1",
                )?;
                stmt.query_map(params![cutoff], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?
            };
            for id in &ids {
                tx.execute(
                    "UPDATE conversations SET status = 'archived', updated_at = ?1 WHERE id = ?2",
                    params![now, id],
                )?;
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Hard-delete a conversation; messages and usage rows cascade.
///
/// Not exercised by normal flows -- test and cleanup tooling only.
pub async fn delete_conversation(db: &Database, id: &str) -> Result<bool, TidedeskError> {
    let id = id.to_string();
    let rows = db
        .connection()
        .call(move |conn| {
            let rows = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidedesk_core::types::{
        ArticleRef, Classification, ClassificationRecord, CustomerContext,
    };

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn make_conversation(id: &str, customer_id: &str, updated_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            status: ConversationStatus::Open,
            priority: None,
            category: None,
            message_count: 0,
            escalated: false,
            human_agent_id: None,
            customer_context: None,
            classification_history: vec![],
            articles_referenced: vec![],
            created_at: updated_at.to_string(),
            updated_at: updated_at.to_string(),
            resolved_at: None,
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrips_json_fields() {
        let db = setup_db().await;
        let mut conv = make_conversation("conv-1", "cust-1", "2026-01-01T10:00:00.000Z");
        conv.customer_context = Some(CustomerContext {
            plan: Some("Pro".to_string()),
            account_age_months: Some(6),
            previous_tickets: Some(2),
        });
        conv.classification_history.push(ClassificationRecord {
            timestamp: "2026-01-01T10:00:00.000Z".to_string(),
            classification: Classification {
                category: "billing".to_string(),
                priority: Priority::High,
                sentiment: "frustrated".to_string(),
                requires_human_escalation: false,
                articles: vec![ArticleRef {
                    id: "kb-1".to_string(),
                    title: "Payment declines".to_string(),
                    relevance_score: 0.92,
                }],
            },
        });
        conv.articles_referenced.push("kb-1".to_string());

        create_conversation(&db, &conv).await.unwrap();
        let retrieved = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(retrieved.customer_id, "cust-1");
        assert_eq!(
            retrieved.customer_context.as_ref().unwrap().plan.as_deref(),
            Some("Pro")
        );
        assert_eq!(retrieved.classification_history.len(), 1);
        assert_eq!(
            retrieved.classification_history[0].classification.category,
            "billing"
        );
        assert_eq!(retrieved.articles_referenced, vec!["kb-1".to_string()]);
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let db = setup_db().await;
        assert!(get_conversation(&db, "no-such").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_recent_active_respects_window_and_status() {
        let db = setup_db().await;
        // Inside the window but resolved: not eligible.
        let mut resolved = make_conversation("conv-r", "cust-1", "2026-01-01T10:00:00.000Z");
        resolved.status = ConversationStatus::Resolved;
        create_conversation(&db, &resolved).await.unwrap();
        // Open but before the cutoff: not eligible.
        let stale = make_conversation("conv-s", "cust-1", "2026-01-01T01:00:00.000Z");
        create_conversation(&db, &stale).await.unwrap();
        // Open and fresh: eligible.
        let fresh = make_conversation("conv-f", "cust-1", "2026-01-01T09:30:00.000Z");
        create_conversation(&db, &fresh).await.unwrap();

        let found = find_recent_active(&db, "cust-1", "2026-01-01T06:00:00.000Z")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "conv-f");
    }

    #[tokio::test]
    async fn find_recent_active_prefers_latest_then_highest_id() {
        let db = setup_db().await;
        let older = make_conversation("conv-a", "cust-1", "2026-01-01T09:00:00.000Z");
        let newer = make_conversation("conv-b", "cust-1", "2026-01-01T09:30:00.000Z");
        // Same updated_at as conv-b: tie breaks by descending id.
        let tied = make_conversation("conv-c", "cust-1", "2026-01-01T09:30:00.000Z");
        create_conversation(&db, &older).await.unwrap();
        create_conversation(&db, &newer).await.unwrap();
        create_conversation(&db, &tied).await.unwrap();

        let found = find_recent_active(&db, "cust-1", "2026-01-01T06:00:00.000Z")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "conv-c");
    }

    #[tokio::test]
    async fn find_recent_active_ignores_other_customers() {
        let db = setup_db().await;
        let other = make_conversation("conv-o", "cust-2", "2026-01-01T09:30:00.000Z");
        create_conversation(&db, &other).await.unwrap();
        let found = find_recent_active(&db, "cust-1", "2026-01-01T06:00:00.000Z")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn update_status_resolved_sets_resolved_at() {
        let db = setup_db().await;
        let conv = make_conversation("conv-1", "cust-1", "2026-01-01T10:00:00.000Z");
        create_conversation(&db, &conv).await.unwrap();

        update_status(
            &db,
            "conv-1",
            ConversationStatus::Resolved,
            None,
            "2026-01-01T11:00:00.000Z",
        )
        .await
        .unwrap();

        let updated = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(updated.status, ConversationStatus::Resolved);
        assert_eq!(
            updated.resolved_at.as_deref(),
            Some("2026-01-01T11:00:00.000Z")
        );
        assert_eq!(updated.updated_at, "2026-01-01T11:00:00.000Z");
    }

    #[tokio::test]
    async fn update_status_escalated_sets_flag_and_agent() {
        let db = setup_db().await;
        let conv = make_conversation("conv-1", "cust-1", "2026-01-01T10:00:00.000Z");
        create_conversation(&db, &conv).await.unwrap();

        update_status(
            &db,
            "conv-1",
            ConversationStatus::Escalated,
            Some("agent-7"),
            "2026-01-01T11:00:00.000Z",
        )
        .await
        .unwrap();

        let updated = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(updated.status, ConversationStatus::Escalated);
        assert!(updated.escalated);
        assert_eq!(updated.human_agent_id.as_deref(), Some("agent-7"));
        assert!(updated.resolved_at.is_none());
    }

    #[tokio::test]
    async fn update_status_missing_conversation_is_typed_not_found() {
        let db = setup_db().await;
        let err = update_status(
            &db,
            "ghost",
            ConversationStatus::Resolved,
            None,
            "2026-01-01T11:00:00.000Z",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            TidedeskError::ConversationNotFound { ref conversation_id } if conversation_id == "ghost"
        ));
    }

    #[tokio::test]
    async fn list_for_customer_is_most_recent_first_and_capped() {
        let db = setup_db().await;
        for i in 0..5 {
            let conv = make_conversation(
                &format!("conv-{i}"),
                "cust-1",
                &format!("2026-01-01T0{i}:00:00.000Z"),
            );
            create_conversation(&db, &conv).await.unwrap();
        }
        let summaries = list_for_customer(&db, "cust-1", 3).await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].conversation_id, "conv-4");
        assert_eq!(summaries[2].conversation_id, "conv-2");
    }

    #[tokio::test]
    async fn archive_older_than_targets_only_old_resolved() {
        let db = setup_db().await;
        let mut old_resolved = make_conversation("conv-old", "cust-1", "2026-01-01T00:00:00.000Z");
        old_resolved.status = ConversationStatus::Resolved;
        old_resolved.resolved_at = Some("2026-01-05T00:00:00.000Z".to_string());
        create_conversation(&db, &old_resolved).await.unwrap();

        let mut fresh_resolved =
            make_conversation("conv-fresh", "cust-1", "2026-04-01T00:00:00.000Z");
        fresh_resolved.status = ConversationStatus::Resolved;
        fresh_resolved.resolved_at = Some("2026-04-01T00:00:00.000Z".to_string());
        create_conversation(&db, &fresh_resolved).await.unwrap();

        let still_open = make_conversation("conv-open", "cust-1", "2026-01-01T00:00:00.000Z");
        create_conversation(&db, &still_open).await.unwrap();

        let archived = archive_older_than(&db, "2026-03-01T00:00:00.000Z", "2026-06-01T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(archived, vec!["conv-old".to_string()]);

        let conv = get_conversation(&db, "conv-old").await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Archived);
        let conv = get_conversation(&db, "conv-open").await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn delete_conversation_reports_whether_row_existed() {
        let db = setup_db().await;
        let conv = make_conversation("conv-1", "cust-1", "2026-01-01T10:00:00.000Z");
        create_conversation(&db, &conv).await.unwrap();
        assert!(delete_conversation(&db, "conv-1").await.unwrap());
        assert!(!delete_conversation(&db, "conv-1").await.unwrap());
    }
}
