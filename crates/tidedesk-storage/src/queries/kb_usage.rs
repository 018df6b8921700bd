// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge-base usage tracking. Rows are append-only; the customer
//! helpfulness feedback is the one field written after the fact.

use rusqlite::params;
use tidedesk_core::TidedeskError;
use tidedesk_core::types::KnowledgeBaseUsage;

use crate::database::{Database, map_tr_err};

/// Insert a usage row inside an existing transaction.
pub(crate) fn insert_usage_tx(
    conn: &rusqlite::Connection,
    usage: &KnowledgeBaseUsage,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO knowledge_base_usage (id, conversation_id, article_id, article_title, \
         relevance_score, was_helpful, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            usage.id,
            usage.conversation_id,
            usage.article_id,
            usage.article_title,
            usage.relevance_score,
            usage.was_helpful,
            usage.created_at,
        ],
    )?;
    Ok(())
}

/// Record which knowledge-base article was consulted for a conversation.
pub async fn insert_usage(db: &Database, usage: &KnowledgeBaseUsage) -> Result<(), TidedeskError> {
    let usage = usage.clone();
    db.connection()
        .call(move |conn| {
            insert_usage_tx(conn, &usage)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List usage rows for a conversation in insertion order.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<KnowledgeBaseUsage>, TidedeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, article_id, article_title, relevance_score, \
                 was_helpful, created_at
                 FROM knowledge_base_usage WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(KnowledgeBaseUsage {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    article_id: row.get(2)?,
                    article_title: row.get(3)?,
                    relevance_score: row.get(4)?,
                    was_helpful: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            let mut usages = Vec::new();
            for row in rows {
                usages.push(row?);
            }
            Ok(usages)
        })
        .await
        .map_err(map_tr_err)
}

/// Record customer feedback on whether a consulted article helped.
pub async fn record_feedback(
    db: &Database,
    usage_id: &str,
    was_helpful: bool,
) -> Result<(), TidedeskError> {
    let id = usage_id.to_string();
    let rows = db
        .connection()
        .call(move |conn| {
            let rows = conn.execute(
                "UPDATE knowledge_base_usage SET was_helpful = ?1 WHERE id = ?2",
                params![was_helpful, id],
            )?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;
    if rows == 0 {
        return Err(TidedeskError::Internal(format!(
            "knowledge-base usage row not found: {usage_id}"
        )));
    }
    Ok(())
}
